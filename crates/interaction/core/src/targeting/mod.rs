//! Candidate filtering, scoring and best-target tracking.
mod scorer;
mod tracker;

pub use scorer::{CandidateScorer, ScoreWeights, WeightedScorer, select_best};
pub use tracker::{TargetChange, TargetTracker};

use std::collections::BTreeSet;

use crate::types::EntityId;
use crate::world::World;

/// Keeps candidates whose interactable is enabled and approachable.
///
/// The precondition is checked with an unset interaction type. A gone
/// interactor is passed as `None`, which rejects every candidate.
pub fn filter_candidates(
    world: &World,
    interactor: EntityId,
    candidates: &BTreeSet<EntityId>,
) -> BTreeSet<EntityId> {
    let caller = world.is_live(interactor).then_some(interactor);
    candidates
        .iter()
        .copied()
        .filter(|candidate| {
            world.interactable(*candidate).is_some_and(|interactable| {
                let context = world.context(interactor, Some(*candidate), None);
                interactable.is_enabled() && interactable.can_interact(caller, &context)
            })
        })
        .collect()
}

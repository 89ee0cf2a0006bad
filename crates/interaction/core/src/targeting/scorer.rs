use std::collections::BTreeSet;

use crate::types::EntityId;
use crate::world::World;

/// Relative weights of the three score terms.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScoreWeights {
    pub distance: f32,
    pub angle: f32,
    pub priority: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            distance: 0.4,
            angle: 0.4,
            priority: 0.2,
        }
    }
}

/// Assigns a desirability to one filtered candidate. Higher is better.
pub trait CandidateScorer: Send + Sync {
    fn score(&self, world: &World, interactor: EntityId, candidate: EntityId, range: f32) -> f32;
}

/// Distance, view angle and priority blended with [`ScoreWeights`].
#[derive(Clone, Copy, Debug, Default)]
pub struct WeightedScorer {
    pub weights: ScoreWeights,
}

impl WeightedScorer {
    /// Priority at which the priority term saturates.
    pub const PRIORITY_SCALE: f32 = 10.0;

    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }
}

impl CandidateScorer for WeightedScorer {
    fn score(&self, world: &World, interactor: EntityId, candidate: EntityId, range: f32) -> f32 {
        let (Some(owner), Some(object)) = (world.object(interactor), world.object(candidate)) else {
            return f32::NEG_INFINITY;
        };
        let owner = owner.placement;
        let position = object.placement.position;

        let distance = owner.position.distance(position);
        let distance_score = if range > 0.0 {
            1.0 - (distance / range).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let to_candidate = (position - owner.view_origin()).normalize_or_zero();
        let angle_score = owner.view_forward().dot(to_candidate);

        let priority = object
            .interactable
            .as_ref()
            .map_or(0, |interactable| interactable.priority());
        let priority_score = (priority as f32 / Self::PRIORITY_SCALE).clamp(0.0, 1.0);

        distance_score * self.weights.distance
            + angle_score * self.weights.angle
            + priority_score * self.weights.priority
    }
}

/// Picks the highest-scoring candidate.
///
/// Candidates are visited by ascending id and only a strictly greater score
/// replaces the current best, so ties go to the lowest id.
pub fn select_best(
    scorer: &dyn CandidateScorer,
    world: &World,
    interactor: EntityId,
    candidates: &BTreeSet<EntityId>,
    range: f32,
) -> Option<EntityId> {
    let mut best = None;
    let mut best_score = f32::NEG_INFINITY;
    for &candidate in candidates {
        let score = scorer.score(world, interactor, candidate, range);
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }
    best
}

use std::collections::BTreeSet;

use crate::types::EntityId;

/// Transition of the best target between two passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetChange {
    pub lost: Option<EntityId>,
    pub found: Option<EntityId>,
}

/// Current candidates and best target of one interactor.
///
/// The best target only changes through [`TargetTracker::update`].
#[derive(Clone, Debug, Default)]
pub struct TargetTracker {
    candidates: BTreeSet<EntityId>,
    best: Option<EntityId>,
}

impl TargetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best(&self) -> Option<EntityId> {
        self.best
    }

    pub fn candidates(&self) -> &BTreeSet<EntityId> {
        &self.candidates
    }

    /// Stores a pass result; returns the transition when the best target changed.
    pub fn update(
        &mut self,
        candidates: BTreeSet<EntityId>,
        best: Option<EntityId>,
    ) -> Option<TargetChange> {
        self.candidates = candidates;
        if self.best == best {
            return None;
        }
        let lost = std::mem::replace(&mut self.best, best);
        Some(TargetChange { lost, found: best })
    }
}

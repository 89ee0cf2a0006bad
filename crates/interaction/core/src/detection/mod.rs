//! Pluggable candidate detection.
//!
//! A strategy turns a source placement and a range into an unordered set of
//! candidate objects. Strategies never look at interactable state; that is the
//! candidate filter's job.
mod radius;
mod ray;

pub use radius::RadiusDetection;
pub use ray::RayDetection;

use std::collections::BTreeSet;

use crate::types::EntityId;
use crate::world::SpatialQuery;

pub trait DetectionStrategy: Send + Sync {
    /// Returns candidates around `source`, or an empty set when `source` has
    /// no world placement.
    fn detect(&self, source: EntityId, range: f32, world: &dyn SpatialQuery) -> BTreeSet<EntityId>;
}

/// Configured choice of built-in strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DetectionMode {
    #[default]
    Radius,
    Ray { multi_hit: bool },
}

impl DetectionMode {
    pub fn strategy(self) -> Box<dyn DetectionStrategy> {
        match self {
            Self::Radius => Box::new(RadiusDetection),
            Self::Ray { multi_hit } => Box::new(RayDetection { multi_hit }),
        }
    }
}

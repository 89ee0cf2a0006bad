use std::collections::BTreeSet;

use super::DetectionStrategy;
use crate::types::EntityId;
use crate::world::SpatialQuery;

/// Every object whose bounds overlap a sphere around the source body.
#[derive(Clone, Copy, Debug, Default)]
pub struct RadiusDetection;

impl DetectionStrategy for RadiusDetection {
    fn detect(&self, source: EntityId, range: f32, world: &dyn SpatialQuery) -> BTreeSet<EntityId> {
        let Some(placement) = world.placement(source) else {
            return BTreeSet::new();
        };
        world
            .sphere_overlap(placement.position, range, source)
            .into_iter()
            .collect()
    }
}

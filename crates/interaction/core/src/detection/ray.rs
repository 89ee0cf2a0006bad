use std::collections::BTreeSet;

use super::DetectionStrategy;
use crate::types::EntityId;
use crate::world::SpatialQuery;

/// Objects along the source's view ray.
#[derive(Clone, Copy, Debug, Default)]
pub struct RayDetection {
    /// When false only the nearest blocking hit is returned.
    pub multi_hit: bool,
}

impl DetectionStrategy for RayDetection {
    fn detect(&self, source: EntityId, range: f32, world: &dyn SpatialQuery) -> BTreeSet<EntityId> {
        let Some(placement) = world.placement(source) else {
            return BTreeSet::new();
        };
        world
            .ray_query(
                placement.view_origin(),
                placement.view_forward(),
                range,
                self.multi_hit,
                source,
            )
            .into_iter()
            .map(|hit| hit.entity)
            .collect()
    }
}

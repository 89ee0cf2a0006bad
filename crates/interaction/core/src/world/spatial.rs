use glam::Vec3;

use super::{Placement, World};
use crate::types::EntityId;

/// A single ray intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub entity: EntityId,
    /// Distance along the ray to the entry point of the bounding sphere.
    pub distance: f32,
}

/// Read-only spatial queries against the live world.
///
/// Implementations must skip the `ignore` entity (the querying source).
pub trait SpatialQuery {
    fn placement(&self, entity: EntityId) -> Option<Placement>;

    /// Hits ordered by distance; at most one when `multi_hit` is false.
    fn ray_query(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        multi_hit: bool,
        ignore: EntityId,
    ) -> Vec<RayHit>;

    fn sphere_overlap(&self, center: Vec3, radius: f32, ignore: EntityId) -> Vec<EntityId>;
}

impl SpatialQuery for World {
    fn placement(&self, entity: EntityId) -> Option<Placement> {
        self.object(entity).map(|object| object.placement)
    }

    fn ray_query(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        multi_hit: bool,
        ignore: EntityId,
    ) -> Vec<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_distance <= 0.0 {
            return Vec::new();
        }

        let mut hits: Vec<RayHit> = self
            .iter()
            .filter(|(id, object)| *id != ignore && object.collidable)
            .filter_map(|(id, object)| {
                let distance =
                    ray_sphere(origin, direction, object.placement.position, object.radius)?;
                (distance <= max_distance).then_some(RayHit { entity: id, distance })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.entity.cmp(&b.entity))
        });
        if !multi_hit {
            hits.truncate(1);
        }
        hits
    }

    fn sphere_overlap(&self, center: Vec3, radius: f32, ignore: EntityId) -> Vec<EntityId> {
        self.iter()
            .filter(|(id, object)| *id != ignore && object.collidable)
            .filter(|(_, object)| {
                let reach = radius + object.radius;
                object.placement.position.distance_squared(center) <= reach * reach
            })
            .map(|(id, _)| id)
            .collect()
    }
}

/// Entry distance of a normalized ray into a sphere; zero when the origin is inside.
fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center - origin;
    let along = to_center.dot(direction);
    let off_axis_sq = to_center.length_squared() - along * along;
    let radius_sq = radius * radius;
    if off_axis_sq > radius_sq {
        return None;
    }
    let half_chord = (radius_sq - off_axis_sq).sqrt();
    let exit = along + half_chord;
    if exit < 0.0 {
        return None;
    }
    Some((along - half_chord).max(0.0))
}

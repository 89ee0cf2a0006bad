//! Arena of world objects addressed by stable identifiers.
//!
//! Every reference to another object is an [`EntityId`]; liveness is checked
//! explicitly against the arena before each use. Iteration is by ascending id,
//! which keeps detection and scoring deterministic.
mod command;
mod spatial;

pub use command::{InteractableSpec, ObjectSpec, WorldCommand, WorldSnapshot};
pub use spatial::{RayHit, SpatialQuery};

use std::collections::BTreeMap;

use glam::Vec3;

use crate::error::WorldError;
use crate::interactable::Interactable;
use crate::types::{EntityId, InteractionContext, InteractionResult, InteractionTag};

/// Camera viewpoint used for aiming (origin and look direction).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewPoint {
    pub origin: Vec3,
    pub forward: Vec3,
}

/// World transform of an object.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    pub position: Vec3,
    /// Body facing; normalized on write.
    pub forward: Vec3,
    pub view: Option<ViewPoint>,
}

impl Placement {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            forward: Vec3::X,
            view: None,
        }
    }

    #[must_use]
    pub fn facing(mut self, forward: Vec3) -> Self {
        self.forward = forward.normalize_or_zero();
        self
    }

    #[must_use]
    pub fn with_view(mut self, view: ViewPoint) -> Self {
        self.view = Some(view);
        self
    }

    /// Camera origin when a view is attached, otherwise the body position.
    pub fn view_origin(&self) -> Vec3 {
        self.view.map_or(self.position, |view| view.origin)
    }

    /// Camera direction when a view is attached, otherwise the body facing.
    pub fn view_forward(&self) -> Vec3 {
        self.view
            .map_or(self.forward, |view| view.forward)
            .normalize_or_zero()
    }
}

/// One object in the arena.
#[derive(Debug)]
pub struct WorldObject {
    pub placement: Placement,
    /// Bounding-sphere radius used by spatial queries.
    pub radius: f32,
    /// Non-collidable objects are invisible to spatial queries.
    pub collidable: bool,
    pub interactable: Option<Interactable>,
}

impl WorldObject {
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            radius: 0.0,
            collidable: true,
            interactable: None,
        }
    }

    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius.max(0.0);
        self
    }

    #[must_use]
    pub fn with_interactable(mut self, interactable: Interactable) -> Self {
        self.interactable = Some(interactable);
        self
    }

    #[must_use]
    pub fn non_collidable(mut self) -> Self {
        self.collidable = false;
        self
    }
}

#[derive(Debug, Default)]
pub struct World {
    objects: BTreeMap<EntityId, WorldObject>,
    next_id: u32,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object under a freshly allocated identifier.
    pub fn spawn(&mut self, object: WorldObject) -> Result<EntityId, WorldError> {
        let id = self.allocate_id()?;
        self.objects.insert(id, object);
        Ok(id)
    }

    /// Hands out the next unused identifier. `u32::MAX` is never allocated, so
    /// an id taken through [`World::spawn_with_id`] is never handed out twice.
    pub(crate) fn allocate_id(&mut self) -> Result<EntityId, WorldError> {
        let id = EntityId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(WorldError::IdsExhausted)?;
        Ok(id)
    }

    /// Inserts an object under a caller-chosen identifier (replication).
    pub fn spawn_with_id(&mut self, id: EntityId, object: WorldObject) -> Result<(), WorldError> {
        if self.objects.contains_key(&id) {
            return Err(WorldError::DuplicateEntity(id));
        }
        self.objects.insert(id, object);
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        Ok(())
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<WorldObject> {
        self.objects.remove(&id)
    }

    #[inline]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn object(&self, id: EntityId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: EntityId) -> Option<&mut WorldObject> {
        self.objects.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &WorldObject)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.object(id).map(|object| object.placement.position)
    }

    pub fn interactable(&self, id: EntityId) -> Option<&Interactable> {
        self.object(id)?.interactable.as_ref()
    }

    pub fn interactable_mut(&mut self, id: EntityId) -> Option<&mut Interactable> {
        self.object_mut(id)?.interactable.as_mut()
    }

    pub fn distance(&self, a: EntityId, b: EntityId) -> Option<f32> {
        Some(self.position(a)?.distance(self.position(b)?))
    }

    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> Result<(), WorldError> {
        self.require_mut(id)?.placement.position = position;
        Ok(())
    }

    /// Moves an object and its attached view by the same offset.
    pub fn translate(&mut self, id: EntityId, offset: Vec3) -> Result<(), WorldError> {
        let placement = &mut self.require_mut(id)?.placement;
        placement.position += offset;
        if let Some(view) = placement.view.as_mut() {
            view.origin += offset;
        }
        Ok(())
    }

    pub fn set_forward(&mut self, id: EntityId, forward: Vec3) -> Result<(), WorldError> {
        self.require_mut(id)?.placement.forward = forward.normalize_or_zero();
        Ok(())
    }

    pub fn set_view(&mut self, id: EntityId, view: Option<ViewPoint>) -> Result<(), WorldError> {
        self.require_mut(id)?.placement.view = view;
        Ok(())
    }

    /// Builds the context for an attempt by `interactor` on `target`.
    ///
    /// A gone target yields a context at the origin with zero distance.
    pub fn context(
        &self,
        interactor: EntityId,
        target: Option<EntityId>,
        kind: Option<InteractionTag>,
    ) -> InteractionContext {
        let context = InteractionContext::new(interactor, target, kind);
        let placed = target.and_then(|target| {
            let location = self.position(target)?;
            let distance = self.position(interactor)?.distance(location);
            Some((location, distance))
        });
        match placed {
            Some((location, distance)) => context.at(location, distance),
            None => context,
        }
    }

    /// Interaction entry point of `target`.
    ///
    /// A gone target or one without the capability is a plain `Failed`.
    pub fn interact(
        &mut self,
        target: EntityId,
        interactor: EntityId,
        kind: Option<&InteractionTag>,
    ) -> InteractionResult {
        let interactor = self.is_live(interactor).then_some(interactor);
        match self.interactable_mut(target) {
            Some(interactable) => interactable.interact(interactor, kind),
            None => InteractionResult::Failed,
        }
    }

    fn require_mut(&mut self, id: EntityId) -> Result<&mut WorldObject, WorldError> {
        self.objects.get_mut(&id).ok_or(WorldError::UnknownEntity(id))
    }
}

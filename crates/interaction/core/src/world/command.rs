//! Data-only world mutations and snapshots used for replication.
//!
//! Handlers and observers are process-local and never travel with these
//! values; a replica only sees what detection, filtering and prompts need.
use glam::Vec3;

use super::{Placement, ViewPoint, World, WorldObject};
use crate::error::WorldError;
use crate::interactable::Interactable;
use crate::types::{EntityId, InteractionOption};

/// Replicated part of an [`Interactable`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractableSpec {
    pub enabled: bool,
    pub options: Vec<InteractionOption>,
    pub priority: i32,
}

impl InteractableSpec {
    pub fn of(interactable: &Interactable) -> Self {
        Self {
            enabled: interactable.is_enabled(),
            options: interactable.configured_options().to_vec(),
            priority: interactable.priority(),
        }
    }

    pub fn build(self) -> Interactable {
        let interactable = Interactable::new(self.options).with_priority(self.priority);
        if self.enabled {
            interactable
        } else {
            interactable.disabled()
        }
    }
}

/// Replicated part of a [`WorldObject`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectSpec {
    pub placement: Placement,
    pub radius: f32,
    pub collidable: bool,
    pub interactable: Option<InteractableSpec>,
}

impl ObjectSpec {
    pub fn of(object: &WorldObject) -> Self {
        Self {
            placement: object.placement,
            radius: object.radius,
            collidable: object.collidable,
            interactable: object.interactable.as_ref().map(InteractableSpec::of),
        }
    }

    pub fn build(self) -> WorldObject {
        WorldObject {
            placement: self.placement,
            radius: self.radius,
            collidable: self.collidable,
            interactable: self.interactable.map(InteractableSpec::build),
        }
    }
}

/// Mutations applied by the authority and mirrored by replicas.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WorldCommand {
    Spawn { id: EntityId, spec: ObjectSpec },
    Despawn { id: EntityId },
    /// Moves the body; an attached view follows by the same offset.
    Move { id: EntityId, position: Vec3 },
    Face { id: EntityId, forward: Vec3 },
    SetView { id: EntityId, view: Option<ViewPoint> },
    SetEnabled { id: EntityId, enabled: bool },
    SetOptions { id: EntityId, options: Vec<InteractionOption> },
    SetPriority { id: EntityId, priority: i32 },
    SetCollidable { id: EntityId, collidable: bool },
}

impl WorldCommand {
    pub fn entity(&self) -> EntityId {
        match self {
            Self::Spawn { id, .. }
            | Self::Despawn { id }
            | Self::Move { id, .. }
            | Self::Face { id, .. }
            | Self::SetView { id, .. }
            | Self::SetEnabled { id, .. }
            | Self::SetOptions { id, .. }
            | Self::SetPriority { id, .. }
            | Self::SetCollidable { id, .. } => *id,
        }
    }
}

/// Data-only copy of a whole world.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldSnapshot {
    pub objects: Vec<(EntityId, ObjectSpec)>,
}

impl World {
    /// Allocates an identifier for a [`WorldCommand::Spawn`] issued later.
    pub fn reserve_id(&mut self) -> Result<EntityId, WorldError> {
        self.allocate_id()
    }

    pub fn apply(&mut self, command: &WorldCommand) -> Result<(), WorldError> {
        match command {
            WorldCommand::Spawn { id, spec } => self.spawn_with_id(*id, spec.clone().build()),
            WorldCommand::Despawn { id } => self
                .despawn(*id)
                .map(drop)
                .ok_or(WorldError::UnknownEntity(*id)),
            WorldCommand::Move { id, position } => {
                let current = self.position(*id).ok_or(WorldError::UnknownEntity(*id))?;
                self.translate(*id, *position - current)
            }
            WorldCommand::Face { id, forward } => self.set_forward(*id, *forward),
            WorldCommand::SetView { id, view } => self.set_view(*id, *view),
            WorldCommand::SetEnabled { id, enabled } => {
                self.require_interactable(*id)?.set_enabled(*enabled);
                Ok(())
            }
            WorldCommand::SetOptions { id, options } => {
                self.require_interactable(*id)?.set_options(options.clone());
                Ok(())
            }
            WorldCommand::SetPriority { id, priority } => {
                self.require_interactable(*id)?.set_priority(*priority);
                Ok(())
            }
            WorldCommand::SetCollidable { id, collidable } => {
                self.object_mut(*id)
                    .ok_or(WorldError::UnknownEntity(*id))?
                    .collidable = *collidable;
                Ok(())
            }
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            objects: self
                .iter()
                .map(|(id, object)| (id, ObjectSpec::of(object)))
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: WorldSnapshot) -> Result<Self, WorldError> {
        let mut world = Self::new();
        for (id, spec) in snapshot.objects {
            world.spawn_with_id(id, spec.build())?;
        }
        Ok(world)
    }

    fn require_interactable(&mut self, id: EntityId) -> Result<&mut Interactable, WorldError> {
        let object = self.object_mut(id).ok_or(WorldError::UnknownEntity(id))?;
        object
            .interactable
            .as_mut()
            .ok_or(WorldError::NotInteractable(id))
    }
}

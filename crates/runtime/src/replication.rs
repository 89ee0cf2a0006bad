//! Authoritative world plus fan-out of every applied mutation.
//!
//! Each requester keeps a replica built from a snapshot and then mirrors the
//! authority by applying the same [`WorldCommand`]s in order.
use tokio::sync::mpsc;
use tracing::warn;

use interaction_core::{EntityId, World, WorldCommand, WorldError};

use crate::events::{Event, EventBus};

pub struct ReplicatedWorld {
    world: World,
    replicas: Vec<mpsc::UnboundedSender<WorldCommand>>,
}

impl ReplicatedWorld {
    pub fn new(world: World) -> Self {
        Self {
            world,
            replicas: Vec::new(),
        }
    }

    /// Registers a replica that is already in sync with the current state.
    pub fn add_replica(&mut self, tx: mpsc::UnboundedSender<WorldCommand>) {
        self.replicas.push(tx);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct access for interaction execution. Structural changes must go
    /// through [`ReplicatedWorld::apply`] or replicas drift.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn reserve_id(&mut self) -> Result<EntityId, WorldError> {
        self.world.reserve_id()
    }

    /// Applies `command` locally, then forwards it to every live replica.
    pub fn apply(&mut self, command: WorldCommand) -> Result<(), WorldError> {
        self.world.apply(&command)?;
        self.replicas.retain(|tx| {
            let open = tx.send(command.clone()).is_ok();
            if !open {
                warn!(target: "runtime::authority", entity = %command.entity(), "replica link closed");
            }
            open
        });
        Ok(())
    }

    /// Forwards status changes and triggers of `entity` onto the bus.
    pub fn bridge_interactable(&mut self, entity: EntityId, bus: &EventBus) -> bool {
        let Some(interactable) = self.world.interactable_mut(entity) else {
            return false;
        };
        let bus = bus.clone();
        interactable.subscribe(move |event| {
            bus.publish(Event::Interactable {
                entity,
                event: event.clone(),
            })
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use interaction_core::{Interactable, ObjectSpec, Placement, WorldObject};

    use crate::events::Topic;

    #[test]
    fn applied_commands_reach_replicas_in_order() {
        let mut authority = ReplicatedWorld::new(World::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        authority.add_replica(tx);
        let mut replica = World::from_snapshot(authority.world().snapshot()).unwrap();

        let id = authority.reserve_id().unwrap();
        authority
            .apply(WorldCommand::Spawn {
                id,
                spec: ObjectSpec::of(&WorldObject::new(Placement::at(Vec3::ZERO))),
            })
            .unwrap();
        authority
            .apply(WorldCommand::Move {
                id,
                position: Vec3::new(5.0, 0.0, 0.0),
            })
            .unwrap();
        while let Ok(command) = rx.try_recv() {
            replica.apply(&command).unwrap();
        }

        assert_eq!(replica.snapshot(), authority.world().snapshot());
    }

    #[test]
    fn rejected_commands_are_not_forwarded() {
        let mut authority = ReplicatedWorld::new(World::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        authority.add_replica(tx);

        let result = authority.apply(WorldCommand::Despawn { id: EntityId(3) });

        assert_eq!(result, Err(WorldError::UnknownEntity(EntityId(3))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn bridged_status_changes_are_published() {
        let mut world = World::new();
        let lamp = world.spawn(
            WorldObject::new(Placement::at(Vec3::ZERO)).with_interactable(Interactable::new(vec![])),
        ).unwrap();
        let mut authority = ReplicatedWorld::new(world);
        let bus = EventBus::with_capacity(4);
        let mut rx = bus.subscribe(Topic::Interactable);

        assert!(authority.bridge_interactable(lamp, &bus));
        authority
            .apply(WorldCommand::SetEnabled {
                id: lamp,
                enabled: false,
            })
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            Event::Interactable {
                entity: lamp,
                event: interaction_core::InteractableEvent::StatusChanged { enabled: false },
            }
        );
    }
}

//! Recycled world-item entities on the authority side.
//!
//! Items are spawned hidden, handed out by [`WorldItemPool::spawn_item`], and
//! parked again on [`WorldItemPool::release`]. A successful pickup queues the
//! entity for release; the queue drains on the pool's next tick.
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use interaction_core::{
    EntityId, InteractableSpec, InteractionHandler, InteractionOption, InteractionResult,
    InteractionTag, ObjectSpec, Placement, WorldCommand, WorldError, log_by_severity,
};

use crate::replication::ReplicatedWorld;

/// Where released items wait, far below the playable world.
pub const PARKING_POSITION: Vec3 = Vec3::new(0.0, 0.0, -100_000.0);

/// Bounding radius of a spawned item.
pub const ITEM_RADIUS: f32 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub initial_size: usize,
    pub max_size: usize,
    /// Seconds an unclaimed item stays in the world; zero keeps it forever.
    pub despawn_timeout: f32,
    pub expand_on_demand: bool,
    /// Items created per tick while pre-warming.
    pub prewarm_batch: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 50,
            max_size: 200,
            despawn_timeout: 300.0,
            expand_on_demand: true,
            prewarm_batch: 10,
        }
    }
}

/// Item data carried by a pooled entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInstance {
    pub definition: String,
    pub display_name: String,
    pub quantity: u32,
}

impl ItemInstance {
    pub fn new(definition: impl Into<String>, display_name: impl Into<String>, quantity: u32) -> Self {
        Self {
            definition: definition.into(),
            display_name: display_name.into(),
            quantity,
        }
    }
}

/// Inventory collaborator that receives picked-up items.
pub trait ItemSink: Send + Sync {
    /// Returns false when `owner` cannot take the item.
    fn try_add(&self, owner: EntityId, item: &ItemInstance) -> bool;
}

/// In-memory sink holding at most `capacity` stacks per owner.
#[derive(Debug)]
pub struct MemoryItemSink {
    capacity: usize,
    items: Mutex<HashMap<EntityId, Vec<ItemInstance>>>,
}

impl MemoryItemSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(HashMap::new()),
        }
    }

    pub fn items_of(&self, owner: EntityId) -> Vec<ItemInstance> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&owner)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MemoryItemSink {
    fn default() -> Self {
        Self::new(20)
    }
}

impl ItemSink for MemoryItemSink {
    fn try_add(&self, owner: EntityId, item: &ItemInstance) -> bool {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let stacks = items.entry(owner).or_default();
        if stacks.len() >= self.capacity {
            return false;
        }
        stacks.push(item.clone());
        true
    }
}

type Slots = Arc<Mutex<BTreeMap<EntityId, ItemInstance>>>;
type Returns = Arc<Mutex<Vec<EntityId>>>;

/// Handler bound to every pooled entity on the authority.
pub struct PickupHandler {
    entity: EntityId,
    slots: Slots,
    returns: Returns,
    sink: Arc<dyn ItemSink>,
}

impl InteractionHandler for PickupHandler {
    fn handle(&mut self, interactor: EntityId, kind: &InteractionTag) -> InteractionResult {
        if *kind != InteractionTag::PICKUP {
            return InteractionResult::Failed;
        }
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(item) = slots.remove(&self.entity) else {
            return InteractionResult::Failed;
        };
        if !self.sink.try_add(interactor, &item) {
            debug!(target: "runtime::authority", entity = %self.entity, %interactor, "item sink refused pickup");
            slots.insert(self.entity, item);
            return InteractionResult::Failed;
        }
        self.returns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.entity);
        InteractionResult::Success
    }
}

/// Counts reported by [`WorldItemPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub available: usize,
    pub active: usize,
    pub total: usize,
}

pub struct WorldItemPool {
    config: PoolConfig,
    available: Vec<EntityId>,
    /// Active items and the seconds they have been out.
    active: BTreeMap<EntityId, f32>,
    total: usize,
    /// Created since the last [`WorldItemPool::take_created`].
    created: Vec<EntityId>,
    slots: Slots,
    returns: Returns,
    sink: Arc<dyn ItemSink>,
}

impl WorldItemPool {
    pub fn new(config: PoolConfig, sink: Arc<dyn ItemSink>) -> Self {
        Self {
            config,
            available: Vec::new(),
            active: BTreeMap::new(),
            total: 0,
            created: Vec::new(),
            slots: Arc::default(),
            returns: Arc::default(),
            sink,
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            available: self.available.len(),
            active: self.active.len(),
            total: self.total,
        }
    }

    /// Entities created since the previous call, for event bridging.
    pub fn take_created(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.created)
    }

    pub fn is_active(&self, entity: EntityId) -> bool {
        self.active.contains_key(&entity)
    }

    pub fn item(&self, entity: EntityId) -> Option<ItemInstance> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entity)
            .cloned()
    }

    /// Creates up to one batch of hidden items while below the initial size.
    pub fn prewarm_step(&mut self, world: &mut ReplicatedWorld) -> Result<usize, WorldError> {
        let missing = self.config.initial_size.saturating_sub(self.total);
        let batch = missing.min(self.config.prewarm_batch.max(1));
        for _ in 0..batch {
            let entity = self.create(world)?;
            self.available.push(entity);
        }
        Ok(batch)
    }

    /// Takes an available item, expanding the pool when allowed.
    pub fn acquire(&mut self, world: &mut ReplicatedWorld) -> Result<Option<EntityId>, WorldError> {
        while let Some(entity) = self.available.pop() {
            if world.world().is_live(entity) {
                return Ok(Some(entity));
            }
            warn!(target: "runtime::authority", %entity, "pooled item despawned externally");
            self.total = self.total.saturating_sub(1);
        }
        if !self.config.expand_on_demand || self.total >= self.config.max_size {
            warn!(target: "runtime::authority", total = self.total, "item pool exhausted");
            return Ok(None);
        }
        self.create(world).map(Some)
    }

    /// Places `item` in the world at `position`. Returns `None` when exhausted.
    pub fn spawn_item(
        &mut self,
        world: &mut ReplicatedWorld,
        item: ItemInstance,
        position: Vec3,
    ) -> Result<Option<EntityId>, WorldError> {
        let Some(entity) = self.acquire(world)? else {
            return Ok(None);
        };
        let option = InteractionOption::new(
            InteractionTag::PICKUP,
            format!("Pick Up {}", item.display_name),
        );
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity, item);
        self.active.insert(entity, 0.0);

        let commands = [
            WorldCommand::Move {
                id: entity,
                position,
            },
            WorldCommand::SetOptions {
                id: entity,
                options: vec![option],
            },
            WorldCommand::SetCollidable {
                id: entity,
                collidable: true,
            },
            WorldCommand::SetEnabled {
                id: entity,
                enabled: true,
            },
        ];
        for command in commands {
            if let Err(error) = world.apply(command) {
                self.forget(entity);
                return Err(error);
            }
        }
        debug!(target: "runtime::authority", %entity, ?position, "item spawned");
        Ok(Some(entity))
    }

    /// Parks an active item and makes it available again.
    ///
    /// An entity despawned behind the pool's back is dropped from it and
    /// reported as [`WorldError::UnknownEntity`].
    pub fn release(&mut self, world: &mut ReplicatedWorld, entity: EntityId) -> Result<bool, WorldError> {
        if !self.active.contains_key(&entity) {
            return Ok(false);
        }
        if !world.world().is_live(entity) {
            self.forget(entity);
            return Err(WorldError::UnknownEntity(entity));
        }
        self.active.remove(&entity);
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&entity);

        for command in [
            WorldCommand::SetEnabled {
                id: entity,
                enabled: false,
            },
            WorldCommand::SetOptions {
                id: entity,
                options: Vec::new(),
            },
            WorldCommand::SetCollidable {
                id: entity,
                collidable: false,
            },
            WorldCommand::Move {
                id: entity,
                position: PARKING_POSITION,
            },
        ] {
            world.apply(command)?;
        }
        self.available.push(entity);
        debug!(target: "runtime::authority", %entity, "item released");
        Ok(true)
    }

    /// Releases every active item. Returns how many were parked.
    pub fn release_all(&mut self, world: &mut ReplicatedWorld) -> usize {
        let active: Vec<EntityId> = self.active.keys().copied().collect();
        active
            .into_iter()
            .filter(|entity| self.release_logged(world, *entity))
            .count()
    }

    /// Releases picked-up and timed-out items, then continues pre-warming.
    ///
    /// A failed release is logged and skipped; only pre-warming errors abort.
    pub fn tick(&mut self, world: &mut ReplicatedWorld, dt: f32) -> Result<(), WorldError> {
        let returned = std::mem::take(&mut *self.returns.lock().unwrap_or_else(PoisonError::into_inner));
        for entity in returned {
            self.release_logged(world, entity);
        }

        if self.config.despawn_timeout > 0.0 {
            let mut expired = Vec::new();
            for (entity, age) in self.active.iter_mut() {
                *age += dt;
                if *age >= self.config.despawn_timeout {
                    expired.push(*entity);
                }
            }
            for entity in expired {
                debug!(target: "runtime::authority", %entity, "item despawn timeout");
                self.release_logged(world, entity);
            }
        }

        self.prewarm_step(world)?;
        Ok(())
    }

    fn release_logged(&mut self, world: &mut ReplicatedWorld, entity: EntityId) -> bool {
        match self.release(world, entity) {
            Ok(released) => released,
            Err(error) => {
                log_by_severity!(error.severity(), target: "runtime::authority", %entity, %error, "item release failed");
                false
            }
        }
    }

    /// Drops an entity the world no longer holds.
    fn forget(&mut self, entity: EntityId) {
        self.active.remove(&entity);
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&entity);
        self.total = self.total.saturating_sub(1);
    }

    fn create(&mut self, world: &mut ReplicatedWorld) -> Result<EntityId, WorldError> {
        let entity = world.reserve_id()?;
        world.apply(WorldCommand::Spawn {
            id: entity,
            spec: ObjectSpec {
                placement: Placement::at(PARKING_POSITION),
                radius: ITEM_RADIUS,
                collidable: false,
                interactable: Some(InteractableSpec {
                    enabled: false,
                    options: Vec::new(),
                    priority: 0,
                }),
            },
        })?;
        let interactable = world
            .world_mut()
            .interactable_mut(entity)
            .ok_or(WorldError::NotInteractable(entity))?;
        interactable.set_handler(PickupHandler {
            entity,
            slots: Arc::clone(&self.slots),
            returns: Arc::clone(&self.returns),
            sink: Arc::clone(&self.sink),
        });
        self.total += 1;
        self.created.push(entity);
        Ok(entity)
    }
}

impl std::fmt::Debug for WorldItemPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldItemPool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interaction_core::{World, WorldObject};

    fn setup(config: PoolConfig, capacity: usize) -> (WorldItemPool, ReplicatedWorld, Arc<MemoryItemSink>, EntityId) {
        let mut world = World::new();
        let player = world.spawn(WorldObject::new(Placement::at(Vec3::ZERO))).unwrap();
        let sink = Arc::new(MemoryItemSink::new(capacity));
        (
            WorldItemPool::new(config, sink.clone()),
            ReplicatedWorld::new(world),
            sink,
            player,
        )
    }

    fn sword() -> ItemInstance {
        ItemInstance::new("weapon.sword", "Sword", 1)
    }

    #[test]
    fn prewarms_in_batches_up_to_initial_size() {
        let config = PoolConfig {
            initial_size: 25,
            ..PoolConfig::default()
        };
        let (mut pool, mut world, _, _) = setup(config, 1);

        pool.tick(&mut world, 0.1).unwrap();
        assert_eq!(pool.stats().total, 10);
        pool.tick(&mut world, 0.1).unwrap();
        pool.tick(&mut world, 0.1).unwrap();
        pool.tick(&mut world, 0.1).unwrap();

        assert_eq!(
            pool.stats(),
            PoolStats {
                available: 25,
                active: 0,
                total: 25
            }
        );
    }

    #[test]
    fn spawned_item_is_interactable_and_released_after_pickup() {
        let (mut pool, mut world, sink, player) = setup(PoolConfig::default(), 4);
        let item = pool
            .spawn_item(&mut world, sword(), Vec3::new(100.0, 0.0, 0.0))
            .unwrap()
            .unwrap();

        let object = world.world().object(item).unwrap();
        assert!(object.collidable);
        let interactable = object.interactable.as_ref().unwrap();
        assert!(interactable.is_enabled());
        assert_eq!(interactable.configured_options()[0].display_text, "Pick Up Sword");

        let result = world.world_mut().interact(item, player, None);
        assert_eq!(result, InteractionResult::Success);
        assert_eq!(sink.items_of(player), vec![sword()]);
        // Still out until the pool ticks.
        assert!(pool.is_active(item));

        pool.tick(&mut world, 0.1).unwrap();
        assert!(!pool.is_active(item));
        let object = world.world().object(item).unwrap();
        assert_eq!(object.placement.position, PARKING_POSITION);
        assert!(!object.collidable);
        assert!(!object.interactable.as_ref().unwrap().is_enabled());
    }

    #[test]
    fn full_sink_leaves_item_in_world() {
        let (mut pool, mut world, sink, player) = setup(PoolConfig::default(), 0);
        let item = pool
            .spawn_item(&mut world, sword(), Vec3::ZERO)
            .unwrap()
            .unwrap();

        assert_eq!(
            world.world_mut().interact(item, player, None),
            InteractionResult::Failed
        );
        pool.tick(&mut world, 0.1).unwrap();

        assert!(pool.is_active(item));
        assert_eq!(pool.item(item), Some(sword()));
        assert!(sink.items_of(player).is_empty());
    }

    #[test]
    fn respects_max_size_and_expansion_flag() {
        let config = PoolConfig {
            initial_size: 0,
            max_size: 2,
            ..PoolConfig::default()
        };
        let (mut pool, mut world, _, _) = setup(config, 1);
        assert!(pool.spawn_item(&mut world, sword(), Vec3::ZERO).unwrap().is_some());
        assert!(pool.spawn_item(&mut world, sword(), Vec3::ZERO).unwrap().is_some());
        assert!(pool.spawn_item(&mut world, sword(), Vec3::ZERO).unwrap().is_none());

        let config = PoolConfig {
            initial_size: 0,
            expand_on_demand: false,
            ..PoolConfig::default()
        };
        let (mut fixed, mut world, _, _) = setup(config, 1);
        assert!(fixed.spawn_item(&mut world, sword(), Vec3::ZERO).unwrap().is_none());
    }

    #[test]
    fn unclaimed_items_time_out() {
        let config = PoolConfig {
            initial_size: 0,
            despawn_timeout: 1.0,
            ..PoolConfig::default()
        };
        let (mut pool, mut world, _, _) = setup(config, 1);
        let item = pool.spawn_item(&mut world, sword(), Vec3::ZERO).unwrap().unwrap();

        pool.tick(&mut world, 0.5).unwrap();
        assert!(pool.is_active(item));
        pool.tick(&mut world, 0.5).unwrap();
        assert!(!pool.is_active(item));
        assert_eq!(pool.stats().available, 1);

        // Reuse hands back the same entity.
        let again = pool.spawn_item(&mut world, sword(), Vec3::ONE).unwrap();
        assert_eq!(again, Some(item));
    }

    #[test]
    fn externally_despawned_items_do_not_stall_the_pool() {
        let config = PoolConfig {
            initial_size: 0,
            despawn_timeout: 1.0,
            ..PoolConfig::default()
        };
        let (mut pool, mut world, _, _) = setup(config, 1);
        let gone = pool.spawn_item(&mut world, sword(), Vec3::ZERO).unwrap().unwrap();
        let kept = pool.spawn_item(&mut world, sword(), Vec3::X).unwrap().unwrap();
        world.apply(WorldCommand::Despawn { id: gone }).unwrap();

        // Both time out together; the dead one must not block the live one.
        pool.tick(&mut world, 1.0).unwrap();
        assert!(!pool.is_active(gone));
        assert!(!pool.is_active(kept));
        assert_eq!(pool.item(gone), None);
        assert_eq!(
            pool.stats(),
            PoolStats {
                available: 1,
                active: 0,
                total: 1
            }
        );
        assert_eq!(
            world.world().position(kept),
            Some(PARKING_POSITION)
        );
    }

    #[test]
    fn acquire_skips_parked_items_that_were_despawned() {
        let config = PoolConfig {
            initial_size: 2,
            ..PoolConfig::default()
        };
        let (mut pool, mut world, _, _) = setup(config, 1);
        pool.tick(&mut world, 0.1).unwrap();
        let parked: Vec<EntityId> = pool.available.clone();
        world
            .apply(WorldCommand::Despawn { id: parked[1] })
            .unwrap();

        let item = pool
            .spawn_item(&mut world, sword(), Vec3::new(50.0, 0.0, 0.0))
            .unwrap()
            .unwrap();
        assert_eq!(item, parked[0]);
        assert_eq!(world.world().position(item), Some(Vec3::new(50.0, 0.0, 0.0)));
        assert_eq!(
            pool.stats(),
            PoolStats {
                available: 0,
                active: 1,
                total: 1
            }
        );
    }

    #[test]
    fn release_all_parks_everything() {
        let (mut pool, mut world, _, _) = setup(
            PoolConfig {
                initial_size: 0,
                ..PoolConfig::default()
            },
            1,
        );
        for x in 0..3 {
            pool.spawn_item(&mut world, sword(), Vec3::new(x as f32, 0.0, 0.0))
                .unwrap();
        }
        assert_eq!(pool.release_all(&mut world), 3);
        assert_eq!(pool.stats().active, 0);
        assert!(!pool.release(&mut world, EntityId(1)).unwrap());
    }
}

//! Authority worker that owns the authoritative world.
//!
//! Re-validates and executes every request arriving from requesters through
//! its mirror [`Interactor`]s, replicates world mutations, ticks the item pool
//! and answers each request with a [`ResultNotify`](interaction_core::ResultNotify).

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use interaction_core::{
    EntityId, InteractionConfig, Interactor, ObjectSpec, Role, WorldCommand, WorldSnapshot,
};

use crate::api::Result;
use crate::events::{Event, EventBus};
use crate::pool::{ItemInstance, ItemSink, PoolConfig, PoolStats, WorldItemPool};
use crate::replication::ReplicatedWorld;
use crate::transport::{InboundFrame, NotifyLink, decode_request};

/// Commands accepted by the authority worker.
pub enum AuthorityCommand {
    /// Apply and replicate a world mutation.
    Apply {
        command: WorldCommand,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Spawn a new object and bridge its interactable events onto the bus.
    Spawn {
        spec: ObjectSpec,
        reply: oneshot::Sender<Result<EntityId>>,
    },
    SpawnItem {
        item: ItemInstance,
        position: Vec3,
        reply: oneshot::Sender<Result<Option<EntityId>>>,
    },
    ReleaseItem {
        entity: EntityId,
        reply: oneshot::Sender<Result<bool>>,
    },
    /// Damage taken by a requester's body; may cancel its live channel.
    Damage {
        interactor: EntityId,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<WorldSnapshot>,
    },
    PoolStats {
        reply: oneshot::Sender<PoolStats>,
    },
}

/// Authoritative side of one requester.
struct Mirror {
    interactor: Interactor,
    link: NotifyLink,
}

pub struct AuthorityWorker {
    world: ReplicatedWorld,
    mirrors: BTreeMap<EntityId, Mirror>,
    pool: WorldItemPool,
    command_rx: mpsc::Receiver<AuthorityCommand>,
    inbound_rx: mpsc::UnboundedReceiver<InboundFrame>,
    event_bus: EventBus,
    ticker: Interval,
    dt: f32,
}

impl AuthorityWorker {
    pub fn new(
        mut world: ReplicatedWorld,
        pool: (PoolConfig, Arc<dyn ItemSink>),
        command_rx: mpsc::Receiver<AuthorityCommand>,
        inbound_rx: mpsc::UnboundedReceiver<InboundFrame>,
        event_bus: EventBus,
        tick_rate_hz: f32,
    ) -> Self {
        let interactables: Vec<EntityId> = world
            .world()
            .iter()
            .filter(|(_, object)| object.interactable.is_some())
            .map(|(id, _)| id)
            .collect();
        for entity in interactables {
            world.bridge_interactable(entity, &event_bus);
        }

        let (period, dt) = super::tick_period(tick_rate_hz);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            target: "runtime::authority",
            objects = world.world().len(),
            tick_rate_hz,
            "authority worker initialized"
        );

        Self {
            world,
            mirrors: BTreeMap::new(),
            pool: WorldItemPool::new(pool.0, pool.1),
            command_rx,
            inbound_rx,
            event_bus,
            ticker,
            dt,
        }
    }

    /// Registers the authoritative mirror of requester `id`.
    pub fn add_mirror(&mut self, id: EntityId, config: InteractionConfig, link: NotifyLink) {
        let mut interactor = Interactor::new(id, Role::Authority, config);
        let bus = self.event_bus.clone();
        interactor.subscribe(move |event| {
            bus.publish(Event::from_interaction(id, Role::Authority, event.clone()))
        });
        self.mirrors.insert(id, Mirror { interactor, link });
    }

    /// Main worker loop. Exits once every command sender is gone.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(frame) = self.inbound_rx.recv() => {
                    self.handle_frame(frame);
                }
                _ = self.ticker.tick() => {
                    self.tick();
                }
            }
        }
        debug!(target: "runtime::authority", "authority worker stopped");
    }

    fn handle_command(&mut self, cmd: AuthorityCommand) {
        match cmd {
            AuthorityCommand::Apply { command, reply } => {
                let result = self.world.apply(command).map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!(target: "runtime::authority", "Apply reply channel closed (caller dropped)");
                }
            }
            AuthorityCommand::Spawn { spec, reply } => {
                let result = self.spawn(spec);
                if reply.send(result).is_err() {
                    debug!(target: "runtime::authority", "Spawn reply channel closed (caller dropped)");
                }
            }
            AuthorityCommand::SpawnItem {
                item,
                position,
                reply,
            } => {
                let result = self.spawn_item(item, position);
                if reply.send(result).is_err() {
                    debug!(target: "runtime::authority", "SpawnItem reply channel closed (caller dropped)");
                }
            }
            AuthorityCommand::ReleaseItem { entity, reply } => {
                let result = self.pool.release(&mut self.world, entity).map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!(target: "runtime::authority", "ReleaseItem reply channel closed (caller dropped)");
                }
            }
            AuthorityCommand::Damage { interactor, reply } => {
                let cancelled = self.damage(interactor);
                if reply.send(cancelled).is_err() {
                    debug!(target: "runtime::authority", "Damage reply channel closed (caller dropped)");
                }
            }
            AuthorityCommand::Snapshot { reply } => {
                if reply.send(self.world.world().snapshot()).is_err() {
                    debug!(target: "runtime::authority", "Snapshot reply channel closed (caller dropped)");
                }
            }
            AuthorityCommand::PoolStats { reply } => {
                if reply.send(self.pool.stats()).is_err() {
                    debug!(target: "runtime::authority", "PoolStats reply channel closed (caller dropped)");
                }
            }
        }
    }

    fn spawn(&mut self, spec: ObjectSpec) -> Result<EntityId> {
        let id = self.world.reserve_id()?;
        self.world.apply(WorldCommand::Spawn { id, spec })?;
        self.world.bridge_interactable(id, &self.event_bus);
        Ok(id)
    }

    fn spawn_item(&mut self, item: ItemInstance, position: Vec3) -> Result<Option<EntityId>> {
        let spawned = self.pool.spawn_item(&mut self.world, item, position);
        self.bridge_new_items();
        Ok(spawned?)
    }

    /// Bridges pool entities created since the last call.
    fn bridge_new_items(&mut self) {
        for entity in self.pool.take_created() {
            self.world.bridge_interactable(entity, &self.event_bus);
        }
    }

    fn damage(&mut self, interactor: EntityId) -> bool {
        let Some(mirror) = self.mirrors.get_mut(&interactor) else {
            warn!(target: "runtime::authority", %interactor, "damage reported for an unknown interactor");
            return false;
        };
        let cancelled = mirror.interactor.notify_damage(self.world.world());
        Self::flush(mirror);
        cancelled
    }

    fn handle_frame(&mut self, frame: InboundFrame) {
        let request = match decode_request(&frame) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: "runtime::authority", from = %frame.from, %error, "dropping undecodable request");
                return;
            }
        };
        let Some(mirror) = self.mirrors.get_mut(&frame.from) else {
            warn!(target: "runtime::authority", from = %frame.from, "request from an unregistered requester");
            return;
        };
        debug!(target: "runtime::authority", from = %frame.from, request = request.name(), id = %request.id(), "request received");
        mirror
            .interactor
            .handle_request(self.world.world_mut(), request);
        Self::flush(mirror);
    }

    fn tick(&mut self) {
        if let Err(error) = self.pool.tick(&mut self.world, self.dt) {
            warn!(target: "runtime::authority", %error, "item pool tick failed");
        }
        self.bridge_new_items();
        for mirror in self.mirrors.values_mut() {
            mirror.interactor.tick(self.world.world_mut(), self.dt);
            Self::flush(mirror);
        }
    }

    fn flush(mirror: &mut Mirror) {
        for notify in mirror.interactor.drain_notifies() {
            if let Err(error) = mirror.link.send(&notify) {
                warn!(
                    target: "runtime::authority",
                    interactor = %mirror.interactor.id(),
                    request = %notify.request,
                    %error,
                    "failed to deliver notify"
                );
            }
        }
    }
}

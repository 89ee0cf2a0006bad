//! High-level runtime orchestrator.
//!
//! The runtime owns the authority worker and one requester worker per
//! controlled agent, wires up the request/notify links and replication
//! channels, and exposes a builder-based API for clients.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use interaction_core::{EntityId, InteractionConfig, World};

use crate::api::{AuthorityHandle, RequesterHandle, Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::pool::{ItemSink, MemoryItemSink, PoolConfig};
use crate::replication::ReplicatedWorld;
use crate::transport::{NotifyLink, RequestLink};
use crate::workers::{AuthorityWorker, RequesterLinks, RequesterWorker, checked_tick_period};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Default configuration of every requester and its authoritative mirror.
    pub interaction: InteractionConfig,
    pub pool: PoolConfig,
    /// Simulation ticks per second on both sides.
    pub tick_rate_hz: f32,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl RuntimeConfig {
    /// Rejects values the workers cannot run with.
    pub fn validate(&self) -> Result<()> {
        if checked_tick_period(self.tick_rate_hz).is_none() {
            return Err(RuntimeError::InvalidTickRate(self.tick_rate_hz));
        }
        if self.command_buffer_size == 0 {
            return Err(RuntimeError::ZeroBuffer { name: "command" });
        }
        if self.event_buffer_size == 0 {
            return Err(RuntimeError::ZeroBuffer { name: "event" });
        }
        self.interaction.validate()?;
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            interaction: InteractionConfig::default(),
            pool: PoolConfig::default(),
            tick_rate_hz: 30.0,
            event_buffer_size: 256,
            command_buffer_size: 32,
        }
    }
}

/// Main runtime that hosts both trust sides in one process.
///
/// [`AuthorityHandle`] and [`RequesterHandle`] provide cloneable façades for
/// clients; the two sides only talk through encoded messages.
pub struct Runtime {
    authority: AuthorityHandle,
    requesters: BTreeMap<EntityId, RequesterHandle>,
    workers: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn authority(&self) -> AuthorityHandle {
        self.authority.clone()
    }

    pub fn requester(&self, id: EntityId) -> Result<RequesterHandle> {
        self.requesters
            .get(&id)
            .cloned()
            .ok_or(RuntimeError::UnknownRequester(id))
    }

    pub fn requester_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.requesters.keys().copied()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.authority.subscribe(topic)
    }

    /// Shutdown the runtime gracefully
    ///
    /// Workers stop once every handle is dropped, including clones held by
    /// clients.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.authority);
        drop(self.requesters);

        for worker in self.workers {
            worker.await.map_err(RuntimeError::WorkerJoin)?;
        }
        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    world: Option<World>,
    requesters: Vec<(EntityId, Option<InteractionConfig>)>,
    item_sink: Option<Arc<dyn ItemSink>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            world: None,
            requesters: Vec::new(),
            item_sink: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Provide the initial authoritative world
    ///
    /// Handlers attached here stay on the authority; requesters only see the
    /// replicated data.
    pub fn world(mut self, world: World) -> Self {
        self.world = Some(world);
        self
    }

    /// Registers a locally controlled agent using the runtime's interaction config.
    pub fn requester(mut self, id: EntityId) -> Self {
        self.requesters.push((id, None));
        self
    }

    /// Registers a locally controlled agent with its own interaction config.
    pub fn requester_with_config(mut self, id: EntityId, config: InteractionConfig) -> Self {
        self.requesters.push((id, Some(config)));
        self
    }

    /// Set the inventory receiving picked-up items (defaults to [`MemoryItemSink`]).
    pub fn item_sink(mut self, sink: Arc<dyn ItemSink>) -> Self {
        self.item_sink = Some(sink);
        self
    }

    pub async fn build(self) -> Result<Runtime> {
        let RuntimeBuilder {
            config,
            world,
            requesters,
            item_sink,
        } = self;
        config.validate()?;

        let mut world = ReplicatedWorld::new(world.unwrap_or_default());
        let event_bus = EventBus::with_capacity(config.event_buffer_size);
        let snapshot = world.world().snapshot();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let mut requester_handles = BTreeMap::new();
        let mut requester_workers = Vec::new();
        let mut mirrors = Vec::new();

        for (id, override_config) in requesters {
            if !world.world().is_live(id) {
                return Err(RuntimeError::MissingInteractor(id));
            }
            if requester_handles.contains_key(&id) {
                return Err(RuntimeError::DuplicateRequester(id));
            }
            let interaction = override_config.unwrap_or_else(|| config.interaction.clone());
            interaction.validate()?;

            let (replication_tx, replication_rx) = mpsc::unbounded_channel();
            let (notify_tx, notify_rx) = mpsc::unbounded_channel();
            let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size);
            world.add_replica(replication_tx);

            let replica = World::from_snapshot(snapshot.clone())?;
            requester_workers.push(RequesterWorker::new(
                id,
                replica,
                interaction.clone(),
                RequesterLinks {
                    command_rx,
                    notify_rx,
                    replication_rx,
                    link: RequestLink::new(id, inbound_tx.clone()),
                },
                event_bus.clone(),
                config.tick_rate_hz,
            ));
            mirrors.push((id, interaction, NotifyLink::new(notify_tx)));
            requester_handles.insert(id, RequesterHandle::new(id, command_tx, event_bus.clone()));
        }
        drop(inbound_tx);

        let sink: Arc<dyn ItemSink> = match item_sink {
            Some(sink) => sink,
            None => Arc::new(MemoryItemSink::default()),
        };
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size);
        let mut authority = AuthorityWorker::new(
            world,
            (config.pool.clone(), sink),
            command_rx,
            inbound_rx,
            event_bus.clone(),
            config.tick_rate_hz,
        );
        for (id, interaction, link) in mirrors {
            authority.add_mirror(id, interaction, link);
        }

        let mut workers = Vec::with_capacity(requester_workers.len() + 1);
        workers.push(tokio::spawn(authority.run()));
        for worker in requester_workers {
            workers.push(tokio::spawn(worker.run()));
        }

        info!(
            target: "runtime",
            requesters = requester_handles.len(),
            tick_rate_hz = config.tick_rate_hz,
            "runtime started"
        );

        Ok(Runtime {
            authority: AuthorityHandle::new(command_tx, event_bus),
            requesters: requester_handles,
            workers,
        })
    }
}

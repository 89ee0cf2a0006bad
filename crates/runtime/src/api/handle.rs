//! Cloneable façades for issuing commands to the runtime workers.
//!
//! [`AuthorityHandle`] drives the authoritative world; one [`RequesterHandle`]
//! exists per locally controlled agent. Both hide channel plumbing behind
//! async helpers and expose the shared event bus.
use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

use interaction_core::{
    ChannelState, EntityId, InteractionResult, InteractionTag, ObjectSpec, Prompt, WorldCommand,
    WorldSnapshot,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::pool::ItemInstance;
use crate::workers::{AuthorityCommand, RequesterCommand};

pub use crate::pool::PoolStats;

const AUTHORITY: &str = "authority";
const REQUESTER: &str = "requester";

/// Handle to the authority worker.
#[derive(Clone)]
pub struct AuthorityHandle {
    command_tx: mpsc::Sender<AuthorityCommand>,
    event_bus: EventBus,
}

impl AuthorityHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<AuthorityCommand>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> AuthorityCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed { worker: AUTHORITY })?;
        reply_rx
            .await
            .map_err(|source| RuntimeError::ReplyChannelClosed {
                worker: AUTHORITY,
                source,
            })
    }

    /// Applies a world mutation and replicates it to every requester.
    pub async fn apply(&self, command: WorldCommand) -> Result<()> {
        self.request(|reply| AuthorityCommand::Apply { command, reply })
            .await?
    }

    /// Spawns an object; its interactable events are published on
    /// [`Topic::Interactable`].
    pub async fn spawn(&self, spec: ObjectSpec) -> Result<EntityId> {
        self.request(|reply| AuthorityCommand::Spawn { spec, reply })
            .await?
    }

    /// Places a pooled pickup in the world. `None` when the pool is exhausted.
    pub async fn spawn_item(&self, item: ItemInstance, position: Vec3) -> Result<Option<EntityId>> {
        self.request(|reply| AuthorityCommand::SpawnItem {
            item,
            position,
            reply,
        })
        .await?
    }

    pub async fn release_item(&self, entity: EntityId) -> Result<bool> {
        self.request(|reply| AuthorityCommand::ReleaseItem { entity, reply })
            .await?
    }

    /// Reports damage to `interactor`; returns true if a channel was cancelled.
    pub async fn damage(&self, interactor: EntityId) -> Result<bool> {
        self.request(|reply| AuthorityCommand::Damage { interactor, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<WorldSnapshot> {
        self.request(|reply| AuthorityCommand::Snapshot { reply })
            .await
    }

    pub async fn pool_stats(&self) -> Result<PoolStats> {
        self.request(|reply| AuthorityCommand::PoolStats { reply })
            .await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use interaction_runtime::Topic;
    ///
    /// let mut rx = authority.subscribe(Topic::Interaction);
    /// while let Ok(event) = rx.recv().await {
    ///     // Started, completed and failed attempts from both sides
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

/// Point-in-time view of a requester's local state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequesterStatus {
    pub current_target: Option<EntityId>,
    pub candidates: Vec<EntityId>,
    pub channel_state: ChannelState,
    pub channel_progress: f32,
    pub prompt: Option<Prompt>,
    pub pending_requests: usize,
}

/// Handle to one requester worker.
#[derive(Clone)]
pub struct RequesterHandle {
    id: EntityId,
    command_tx: mpsc::Sender<RequesterCommand>,
    event_bus: EventBus,
}

impl RequesterHandle {
    pub(crate) fn new(
        id: EntityId,
        command_tx: mpsc::Sender<RequesterCommand>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            id,
            command_tx,
            event_bus,
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RequesterCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed { worker: REQUESTER })?;
        reply_rx
            .await
            .map_err(|source| RuntimeError::ReplyChannelClosed {
                worker: REQUESTER,
                source,
            })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Instant attempt on the current best target.
    ///
    /// Returns `InProgress` once the request is forwarded; the verdict arrives
    /// as a terminal event on [`Topic::Interaction`].
    pub async fn try_interact(&self, kind: Option<InteractionTag>) -> Result<InteractionResult> {
        self.request(|reply| RequesterCommand::TryInteract {
            target: None,
            kind,
            reply,
        })
        .await
    }

    pub async fn try_interact_with(
        &self,
        target: EntityId,
        kind: Option<InteractionTag>,
    ) -> Result<InteractionResult> {
        self.request(|reply| RequesterCommand::TryInteract {
            target: Some(target),
            kind,
            reply,
        })
        .await
    }

    /// Starts a channeled attempt on the current best target.
    pub async fn start_channel(&self, kind: Option<InteractionTag>, duration: f32) -> Result<()> {
        self.request(|reply| RequesterCommand::StartChannel {
            target: None,
            kind,
            duration,
            reply,
        })
        .await?
    }

    pub async fn start_channel_with(
        &self,
        target: EntityId,
        kind: Option<InteractionTag>,
        duration: f32,
    ) -> Result<()> {
        self.request(|reply| RequesterCommand::StartChannel {
            target: Some(target),
            kind,
            duration,
            reply,
        })
        .await?
    }

    /// Cancels the live channel; false when nothing was channeling.
    pub async fn cancel_channel(&self) -> Result<bool> {
        self.request(|reply| RequesterCommand::CancelChannel { reply })
            .await
    }

    pub async fn status(&self) -> Result<RequesterStatus> {
        self.request(|reply| RequesterCommand::Status { reply })
            .await
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }
}

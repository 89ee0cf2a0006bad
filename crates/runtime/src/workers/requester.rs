//! Requester worker for one locally controlled agent.
//!
//! Runs detection against a replica of the authoritative world, answers
//! local attempts immediately with `InProgress` or a pre-check failure, and
//! turns the authority's notifies into terminal events.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use interaction_core::{
    ChannelError, EntityId, InteractionConfig, InteractionResult, InteractionTag, Interactor,
    Role, ValidationError, World, WorldCommand,
};

use crate::api::{RequesterStatus, Result};
use crate::events::{Event, EventBus};
use crate::transport::{RequestLink, decode_notify};

/// Commands accepted by a requester worker.
pub enum RequesterCommand {
    /// Instant attempt; `None` targets the current best candidate.
    TryInteract {
        target: Option<EntityId>,
        kind: Option<InteractionTag>,
        reply: oneshot::Sender<InteractionResult>,
    },
    /// Channeled attempt; `None` targets the current best candidate.
    StartChannel {
        target: Option<EntityId>,
        kind: Option<InteractionTag>,
        duration: f32,
        reply: oneshot::Sender<Result<()>>,
    },
    CancelChannel {
        reply: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<RequesterStatus>,
    },
}

pub struct RequesterWorker {
    replica: World,
    interactor: Interactor,
    command_rx: mpsc::Receiver<RequesterCommand>,
    notify_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    replication_rx: mpsc::UnboundedReceiver<WorldCommand>,
    link: RequestLink,
    ticker: Interval,
    dt: f32,
}

/// Channels wiring one requester to the authority.
pub struct RequesterLinks {
    pub command_rx: mpsc::Receiver<RequesterCommand>,
    pub notify_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pub replication_rx: mpsc::UnboundedReceiver<WorldCommand>,
    pub link: RequestLink,
}

impl RequesterWorker {
    pub fn new(
        id: EntityId,
        replica: World,
        config: InteractionConfig,
        links: RequesterLinks,
        event_bus: EventBus,
        tick_rate_hz: f32,
    ) -> Self {
        let mut interactor = Interactor::new(id, Role::Requester, config);
        interactor.subscribe(move |event| {
            event_bus.publish(Event::from_interaction(id, Role::Requester, event.clone()))
        });

        let (period, dt) = super::tick_period(tick_rate_hz);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(target: "runtime::requester", interactor = %id, objects = replica.len(), "requester worker initialized");

        Self {
            replica,
            interactor,
            command_rx: links.command_rx,
            notify_rx: links.notify_rx,
            replication_rx: links.replication_rx,
            link: links.link,
            ticker,
            dt,
        }
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
                Some(command) = self.replication_rx.recv() => {
                    if let Err(error) = self.replica.apply(&command) {
                        warn!(target: "runtime::requester", interactor = %self.interactor.id(), %error, "replica diverged");
                    }
                }
                Some(bytes) = self.notify_rx.recv() => {
                    self.handle_notify(&bytes);
                }
                _ = self.ticker.tick() => {
                    self.interactor.tick(&mut self.replica, self.dt);
                    self.flush();
                }
            }
        }
        debug!(target: "runtime::requester", interactor = %self.interactor.id(), "requester worker stopped");
    }

    fn handle_command(&mut self, cmd: RequesterCommand) {
        match cmd {
            RequesterCommand::TryInteract {
                target,
                kind,
                reply,
            } => {
                let result = match target {
                    Some(target) => self
                        .interactor
                        .try_interact_with(&mut self.replica, target, kind),
                    None => self.interactor.try_interact(&mut self.replica, kind),
                };
                self.flush();
                if reply.send(result).is_err() {
                    debug!(target: "runtime::requester", "TryInteract reply channel closed (caller dropped)");
                }
            }
            RequesterCommand::StartChannel {
                target,
                kind,
                duration,
                reply,
            } => {
                let result = self.start_channel(target, kind, duration);
                self.flush();
                if reply.send(result).is_err() {
                    debug!(target: "runtime::requester", "StartChannel reply channel closed (caller dropped)");
                }
            }
            RequesterCommand::CancelChannel { reply } => {
                let cancelled = self.interactor.cancel_channel(&self.replica);
                self.flush();
                if reply.send(cancelled).is_err() {
                    debug!(target: "runtime::requester", "CancelChannel reply channel closed (caller dropped)");
                }
            }
            RequesterCommand::Status { reply } => {
                if reply.send(self.status()).is_err() {
                    debug!(target: "runtime::requester", "Status reply channel closed (caller dropped)");
                }
            }
        }
    }

    fn start_channel(
        &mut self,
        target: Option<EntityId>,
        kind: Option<InteractionTag>,
        duration: f32,
    ) -> Result<()> {
        let target = target
            .or_else(|| self.interactor.current_target())
            .ok_or(ChannelError::Validation(ValidationError::NoTarget))?;
        self.interactor
            .start_channel(&self.replica, target, kind, duration)?;
        Ok(())
    }

    fn handle_notify(&mut self, bytes: &[u8]) {
        match decode_notify(bytes) {
            Ok(notify) => self.interactor.handle_notify(&self.replica, notify),
            Err(error) => {
                warn!(target: "runtime::requester", interactor = %self.interactor.id(), %error, "dropping undecodable notify");
            }
        }
    }

    fn flush(&mut self) {
        for request in self.interactor.drain_requests() {
            if let Err(error) = self.link.send(&request) {
                warn!(
                    target: "runtime::requester",
                    interactor = %self.interactor.id(),
                    request = %request.id(),
                    %error,
                    "failed to forward request"
                );
            }
        }
    }

    fn status(&self) -> RequesterStatus {
        let channel = self.interactor.channel();
        RequesterStatus {
            current_target: self.interactor.current_target(),
            candidates: self.interactor.candidates().iter().copied().collect(),
            channel_state: channel.state(),
            channel_progress: channel.progress(),
            prompt: self.interactor.prompt(&self.replica),
            pending_requests: self.interactor.pending_requests(),
        }
    }
}

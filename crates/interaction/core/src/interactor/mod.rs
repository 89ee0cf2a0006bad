//! The interaction executor.
//!
//! One [`Interactor`] exists per controlled agent on each trust side. The two
//! instances never share memory; they reconcile only through
//! [`AuthorityRequest`] and [`ResultNotify`] messages, which the caller moves
//! between them with [`Interactor::drain_requests`] and
//! [`Interactor::drain_notifies`].
//!
//! | role         | detects | executes effects | sends        |
//! |--------------|---------|------------------|--------------|
//! | `Standalone` | yes     | yes              | nothing      |
//! | `Requester`  | yes     | no               | requests     |
//! | `Authority`  | no      | yes              | notifies     |
mod validation;

pub use validation::validate;

use std::collections::BTreeMap;

use tracing::{debug, info, trace, warn};

use crate::channel::{CancelPolicy, CancelReason, ChannelLimits, ChannelStep, ChanneledSession};
use crate::config::InteractionConfig;
use crate::detection::DetectionStrategy;
use crate::error::{ChannelError, ValidationError};
use crate::events::{EventKind, InteractionEvent, Observers, SubscriptionId};
use crate::prompt::Prompt;
use crate::protocol::{AuthorityRequest, RequestId, ResultNotify};
use crate::schedule::Cadence;
use crate::targeting::{
    CandidateScorer, TargetTracker, WeightedScorer, filter_candidates, select_best,
};
use crate::types::{EntityId, InteractionContext, InteractionResult, InteractionTag, Role};
use crate::world::World;

/// Request awaiting its notify on the requester side.
#[derive(Clone, Debug)]
struct PendingRequest {
    target: EntityId,
    kind: Option<InteractionTag>,
    channel: bool,
}

pub struct Interactor {
    id: EntityId,
    role: Role,
    config: InteractionConfig,
    detection: Box<dyn DetectionStrategy>,
    scorer: Box<dyn CandidateScorer>,
    tracker: TargetTracker,
    session: ChanneledSession,
    cadence: Cadence,
    events: Observers<InteractionEvent>,
    outbox: Vec<AuthorityRequest>,
    notifies: Vec<ResultNotify>,
    pending: BTreeMap<RequestId, PendingRequest>,
    next_request: u64,
}

impl Interactor {
    pub fn new(id: EntityId, role: Role, config: InteractionConfig) -> Self {
        Self {
            id,
            role,
            detection: config.detection.strategy(),
            scorer: Box::new(WeightedScorer::new(config.weights)),
            cadence: Cadence::new(config.detection_interval),
            config,
            tracker: TargetTracker::new(),
            session: ChanneledSession::default(),
            events: Observers::new(),
            outbox: Vec::new(),
            notifies: Vec::new(),
            pending: BTreeMap::new(),
            next_request: 0,
        }
    }

    #[must_use]
    pub fn with_detection(mut self, detection: impl DetectionStrategy + 'static) -> Self {
        self.detection = Box::new(detection);
        self
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: impl CandidateScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn current_target(&self) -> Option<EntityId> {
        self.tracker.best()
    }

    pub fn candidates(&self) -> &std::collections::BTreeSet<EntityId> {
        self.tracker.candidates()
    }

    pub fn channel(&self) -> &ChanneledSession {
        &self.session
    }

    /// Requests still waiting for a notify.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Prompt for the current best target.
    pub fn prompt(&self, world: &World) -> Option<Prompt> {
        Prompt::for_target(world, self.tracker.best()?)
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&InteractionEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(callback)
    }

    pub fn subscribe_kind(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&InteractionEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe_kind(kind, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Advances one simulation tick: a detection pass when due, then the
    /// live channel, if any.
    pub fn tick(&mut self, world: &mut World, dt: f32) {
        if self.role.detects() && self.cadence.advance(dt) {
            self.update_targets(world);
        }
        self.advance_channel(world, dt);
    }

    /// Runs detection, filtering and scoring, then reports a changed best target.
    ///
    /// The lost event for the previous best always precedes the found event.
    pub fn update_targets(&mut self, world: &World) {
        let raw = self.detection.detect(self.id, self.config.range, world);
        let candidates = filter_candidates(world, self.id, &raw);
        let best = select_best(
            self.scorer.as_ref(),
            world,
            self.id,
            &candidates,
            self.config.range,
        );

        let Some(change) = self.tracker.update(candidates, best) else {
            return;
        };
        debug!(
            interactor = %self.id,
            lost = ?change.lost,
            found = ?change.found,
            "best target changed"
        );
        if let Some(target) = change.lost {
            self.events.emit(&InteractionEvent::TargetLost { target });
        }
        if let Some(target) = change.found {
            self.events.emit(&InteractionEvent::TargetFound { target });
        }
    }

    /// Instant interaction with the current best target.
    pub fn try_interact(&mut self, world: &mut World, kind: Option<InteractionTag>) -> InteractionResult {
        let target = self.tracker.best();
        self.attempt(world, target, kind)
    }

    /// Instant interaction with an explicit target.
    pub fn try_interact_with(
        &mut self,
        world: &mut World,
        target: EntityId,
        kind: Option<InteractionTag>,
    ) -> InteractionResult {
        self.attempt(world, Some(target), kind)
    }

    fn attempt(
        &mut self,
        world: &mut World,
        target: Option<EntityId>,
        kind: Option<InteractionTag>,
    ) -> InteractionResult {
        let authoritative = self.role.is_authoritative();
        let Some(target) = target else {
            return ValidationError::NoTarget.result_code(authoritative);
        };
        let context = world.context(self.id, Some(target), kind);
        if let Err(error) = validate(world, &context, self.local_limit()) {
            crate::log_by_severity!(error.severity(), interactor = %self.id, %error, "interaction rejected");
            return error.result_code(authoritative);
        }

        if self.role == Role::Requester {
            let request = self.track(target, context.kind.clone(), false);
            self.outbox.push(AuthorityRequest::Interact {
                request,
                target,
                kind: context.kind,
            });
            return InteractionResult::InProgress;
        }
        self.execute(world, context, target)
    }

    fn execute(
        &mut self,
        world: &mut World,
        context: InteractionContext,
        target: EntityId,
    ) -> InteractionResult {
        self.events.emit(&InteractionEvent::Started {
            context: context.clone(),
        });
        let result = world.interact(target, self.id, context.kind.as_ref());
        info!(interactor = %self.id, target = %target, result = %result, "interaction executed");
        self.events.emit(&InteractionEvent::outcome(context, result));
        result
    }

    /// Starts a channeled interaction. A second start while channeling is
    /// rejected and leaves the live session untouched.
    pub fn start_channel(
        &mut self,
        world: &World,
        target: EntityId,
        kind: Option<InteractionTag>,
        duration: f32,
    ) -> Result<(), ChannelError> {
        let context = world.context(self.id, Some(target), kind);
        let checked = if self.session.is_channeling() {
            Err(ChannelError::AlreadyChanneling)
        } else {
            validate(world, &context, self.local_limit()).map_err(ChannelError::from)
        };
        if let Err(error) = checked {
            crate::log_by_severity!(error.severity(), interactor = %self.id, %target, %error, "channel rejected");
            return Err(error);
        }

        let request = (self.role == Role::Requester).then(|| self.next_request_id());
        let kind = context.kind.clone();
        self.begin_session(world, context, duration, request)?;

        if let Some(request) = request {
            self.pending.insert(
                request,
                PendingRequest {
                    target,
                    kind: kind.clone(),
                    channel: true,
                },
            );
            self.outbox.push(AuthorityRequest::ChannelStart {
                request,
                target,
                kind,
                duration,
            });
        }
        Ok(())
    }

    fn begin_session(
        &mut self,
        world: &World,
        context: InteractionContext,
        duration: f32,
        request: Option<RequestId>,
    ) -> Result<(), ChannelError> {
        let (Some(target), Some(start)) = (context.target, world.position(self.id)) else {
            return Err(ValidationError::InteractorMissing {
                interactor: self.id,
            }
            .into());
        };
        self.session
            .begin(target, context.kind.clone(), duration, start, request)?;
        debug!(interactor = %self.id, target = %target, duration, "channel started");
        self.events.emit(&InteractionEvent::Started { context });
        Ok(())
    }

    /// Cancels the live channel on behalf of the local caller.
    pub fn cancel_channel(&mut self, world: &World) -> bool {
        if !self.session.interrupt() {
            return false;
        }
        self.finish_cancelled(world, CancelReason::Requested);
        true
    }

    /// Reports damage taken by this interactor; cancels the live channel when
    /// the policy says so.
    pub fn notify_damage(&mut self, world: &World) -> bool {
        if !self.config.cancel_policy.contains(CancelPolicy::DAMAGE) || !self.session.interrupt() {
            return false;
        }
        self.finish_cancelled(world, CancelReason::Damaged);
        true
    }

    fn advance_channel(&mut self, world: &mut World, dt: f32) {
        let limits = ChannelLimits::from_config(&self.config);
        match self.session.advance(world, self.id, dt, &limits) {
            None => {}
            Some(ChannelStep::Advanced { progress, completed }) => {
                trace!(interactor = %self.id, progress, "channel progress");
                self.events.emit(&InteractionEvent::Progress {
                    target: self.session.target(),
                    progress,
                });
                if completed {
                    self.finish_completed(world);
                }
            }
            Some(ChannelStep::Cancelled(reason)) => self.finish_cancelled(world, reason),
        }
    }

    fn finish_completed(&mut self, world: &mut World) {
        let session = self.session.reset();
        let Some(target) = session.target() else {
            return;
        };
        if !self.role.is_authoritative() {
            // Effects only run on the authority; its notify ends the attempt.
            debug!(interactor = %self.id, target = %target, "channel elapsed, awaiting authority");
            return;
        }

        let kind = session.kind().cloned();
        let context = world.context(self.id, Some(target), kind.clone());
        let result = world.interact(target, self.id, kind.as_ref());
        info!(interactor = %self.id, target = %target, result = %result, "channel completed");
        self.events.emit(&InteractionEvent::outcome(context, result));

        if let Some(request) = session.request() {
            self.notifies.push(ResultNotify {
                request,
                target,
                kind,
                result,
            });
        }
    }

    fn finish_cancelled(&mut self, world: &World, reason: CancelReason) {
        let session = self.session.reset();
        let kind = session.kind().cloned();
        let context = world.context(self.id, session.target(), kind.clone());
        debug!(interactor = %self.id, target = ?session.target(), %reason, "channel cancelled");
        self.events.emit(&InteractionEvent::Failed {
            context,
            result: InteractionResult::Cancelled,
        });

        let (Some(request), Some(target)) = (session.request(), session.target()) else {
            return;
        };
        match self.role {
            Role::Requester => {
                // The terminal event was just emitted; a late notify is stale.
                self.pending.remove(&request);
                self.outbox.push(AuthorityRequest::ChannelCancel { request });
            }
            Role::Authority if reason != CancelReason::RemoteRequest => {
                self.notifies.push(ResultNotify {
                    request,
                    target,
                    kind,
                    result: InteractionResult::Cancelled,
                });
            }
            _ => {}
        }
    }

    /// Requests produced since the last drain, in issue order.
    pub fn drain_requests(&mut self) -> Vec<AuthorityRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Notifies produced since the last drain, in issue order.
    pub fn drain_notifies(&mut self) -> Vec<ResultNotify> {
        std::mem::take(&mut self.notifies)
    }

    /// Authority side: re-validates and executes a remote request.
    ///
    /// Every request except a cancel is eventually answered by exactly one notify.
    pub fn handle_request(&mut self, world: &mut World, message: AuthorityRequest) {
        if self.role != Role::Authority {
            warn!(interactor = %self.id, role = %self.role, request = message.name(), "request delivered to a non-authority interactor");
            return;
        }
        match message {
            AuthorityRequest::Interact {
                request,
                target,
                kind,
            } => {
                let context = world.context(self.id, Some(target), kind.clone());
                let result = match validate(world, &context, self.authority_limit()) {
                    Ok(()) => self.execute(world, context, target),
                    Err(error) => {
                        crate::log_by_severity!(error.severity(), interactor = %self.id, %request, %error, "remote interaction rejected");
                        error.result_code(true)
                    }
                };
                self.notifies.push(ResultNotify {
                    request,
                    target,
                    kind,
                    result,
                });
            }
            AuthorityRequest::ChannelStart {
                request,
                target,
                kind,
                duration,
            } => {
                if let Err(error) = self.start_remote_channel(world, request, target, kind.clone(), duration) {
                    crate::log_by_severity!(error.severity(), interactor = %self.id, %request, %error, "remote channel rejected");
                    self.notifies.push(ResultNotify {
                        request,
                        target,
                        kind,
                        result: error.result_code(true),
                    });
                }
            }
            AuthorityRequest::ChannelCancel { request } => {
                if self.session.request() == Some(request) && self.session.interrupt() {
                    self.finish_cancelled(world, CancelReason::RemoteRequest);
                } else {
                    debug!(interactor = %self.id, %request, "cancel for a session that is no longer live");
                }
            }
        }
    }

    fn start_remote_channel(
        &mut self,
        world: &World,
        request: RequestId,
        target: EntityId,
        kind: Option<InteractionTag>,
        duration: f32,
    ) -> Result<(), ChannelError> {
        if self.session.is_channeling() {
            return Err(ChannelError::AlreadyChanneling);
        }
        let context = world.context(self.id, Some(target), kind);
        validate(world, &context, self.authority_limit())?;
        self.begin_session(world, context, duration, Some(request))
    }

    /// Requester side: turns an authority verdict into the terminal event.
    ///
    /// Notifies for unknown or already resolved requests are dropped.
    pub fn handle_notify(&mut self, world: &World, notify: ResultNotify) {
        let Some(pending) = self.pending.remove(&notify.request) else {
            debug!(interactor = %self.id, request = %notify.request, result = %notify.result, "dropping stale notify");
            return;
        };
        if pending.channel && self.session.request() == Some(notify.request) {
            self.session.reset();
        }

        let context = world.context(self.id, Some(pending.target), pending.kind);
        info!(interactor = %self.id, target = %pending.target, result = %notify.result, "authority resolved request");
        self.events
            .emit(&InteractionEvent::outcome(context, notify.result));
    }

    fn track(&mut self, target: EntityId, kind: Option<InteractionTag>, channel: bool) -> RequestId {
        let request = self.next_request_id();
        self.pending.insert(
            request,
            PendingRequest {
                target,
                kind,
                channel,
            },
        );
        request
    }

    fn next_request_id(&mut self) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        id
    }

    fn local_limit(&self) -> f32 {
        self.config.range * InteractionConfig::LOCAL_RANGE_TOLERANCE
    }

    fn authority_limit(&self) -> f32 {
        self.config.range * self.config.authority_range_tolerance
    }
}

impl std::fmt::Debug for Interactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interactor")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("current_target", &self.tracker.best())
            .field("session", &self.session)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;

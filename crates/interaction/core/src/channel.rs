//! Timed interactions that require sustained proximity.
//!
//! A [`ChanneledSession`] is advanced once per simulation tick. It only
//! decides *what* happened; emitting events, executing the target and talking
//! to the other trust side is the [`Interactor`](crate::Interactor)'s job.
use bitflags::bitflags;
use glam::Vec3;

use crate::config::InteractionConfig;
use crate::error::ChannelError;
use crate::protocol::RequestId;
use crate::types::{EntityId, InteractionTag};
use crate::world::World;

bitflags! {
    /// Optional cancel conditions. A destroyed or disabled target always cancels.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CancelPolicy: u8 {
        /// Interactor moved beyond the move threshold from where it started.
        const MOVEMENT = 1 << 0;
        /// Interactor drifted beyond the tolerated range of the target.
        const RANGE    = 1 << 1;
        /// Interactor took damage.
        const DAMAGE   = 1 << 2;
    }
}

impl Default for CancelPolicy {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelState {
    #[default]
    Idle,
    Channeling,
    /// Transient; held until the session is reset.
    Completed,
    /// Transient; held until the session is reset.
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CancelReason {
    TargetLost,
    TargetDisabled,
    InteractorLost,
    MovedTooFar,
    OutOfRange,
    Damaged,
    /// Cancelled by the local caller.
    Requested,
    /// Cancelled by the remote requester that owns the session.
    RemoteRequest,
}

/// Per-tick thresholds derived from [`InteractionConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelLimits {
    pub move_threshold: f32,
    pub max_distance: f32,
    pub policy: CancelPolicy,
}

impl ChannelLimits {
    pub fn from_config(config: &InteractionConfig) -> Self {
        Self {
            move_threshold: config.cancel_move_threshold,
            max_distance: config.channel_max_distance(),
            policy: config.cancel_policy,
        }
    }
}

/// Outcome of one [`ChanneledSession::advance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChannelStep {
    Advanced { progress: f32, completed: bool },
    Cancelled(CancelReason),
}

/// The at-most-one timed interaction of an interactor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChanneledSession {
    target: Option<EntityId>,
    kind: Option<InteractionTag>,
    duration: f32,
    elapsed: f32,
    progress: f32,
    start_location: Vec3,
    state: ChannelState,
    request: Option<RequestId>,
}

impl ChanneledSession {
    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_channeling(&self) -> bool {
        self.state == ChannelState::Channeling
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn kind(&self) -> Option<&InteractionTag> {
        self.kind.as_ref()
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn start_location(&self) -> Vec3 {
        self.start_location
    }

    /// Request that opened this session on the other trust side, if any.
    pub fn request(&self) -> Option<RequestId> {
        self.request
    }

    /// Enters `Channeling`. Only allowed from `Idle` with a positive duration.
    pub fn begin(
        &mut self,
        target: EntityId,
        kind: Option<InteractionTag>,
        duration: f32,
        start_location: Vec3,
        request: Option<RequestId>,
    ) -> Result<(), ChannelError> {
        if self.state != ChannelState::Idle {
            return Err(ChannelError::AlreadyChanneling);
        }
        if !(duration > 0.0) || !duration.is_finite() {
            return Err(ChannelError::InvalidDuration { duration });
        }
        *self = Self {
            target: Some(target),
            kind,
            duration,
            elapsed: 0.0,
            progress: 0.0,
            start_location,
            state: ChannelState::Channeling,
            request,
        };
        Ok(())
    }

    /// Applies the cancel rules, then moves time forward by `dt`.
    ///
    /// Returns `None` unless the session is channeling.
    pub fn advance(
        &mut self,
        world: &World,
        interactor: EntityId,
        dt: f32,
        limits: &ChannelLimits,
    ) -> Option<ChannelStep> {
        if !self.is_channeling() {
            return None;
        }
        if let Some(reason) = self.cancel_condition(world, interactor, limits) {
            self.state = ChannelState::Cancelled;
            return Some(ChannelStep::Cancelled(reason));
        }

        self.elapsed += dt.max(0.0);
        self.progress = (self.elapsed / self.duration).clamp(0.0, 1.0);
        let completed = self.elapsed >= self.duration;
        if completed {
            self.state = ChannelState::Completed;
        }
        Some(ChannelStep::Advanced {
            progress: self.progress,
            completed,
        })
    }

    /// Marks a live session cancelled. Returns false when nothing was channeling.
    pub fn interrupt(&mut self) -> bool {
        if !self.is_channeling() {
            return false;
        }
        self.state = ChannelState::Cancelled;
        true
    }

    /// Returns the session as it was and rests at `Idle`.
    pub fn reset(&mut self) -> ChanneledSession {
        std::mem::take(self)
    }

    fn cancel_condition(
        &self,
        world: &World,
        interactor: EntityId,
        limits: &ChannelLimits,
    ) -> Option<CancelReason> {
        let Some(target) = self.target.filter(|target| world.is_live(*target)) else {
            return Some(CancelReason::TargetLost);
        };
        if !world
            .interactable(target)
            .is_some_and(|interactable| interactable.is_enabled())
        {
            return Some(CancelReason::TargetDisabled);
        }
        let Some(position) = world.position(interactor) else {
            return Some(CancelReason::InteractorLost);
        };
        if limits.policy.contains(CancelPolicy::MOVEMENT)
            && position.distance(self.start_location) > limits.move_threshold
        {
            return Some(CancelReason::MovedTooFar);
        }
        if limits.policy.contains(CancelPolicy::RANGE)
            && world
                .position(target)
                .is_some_and(|target| position.distance(target) > limits.max_distance)
        {
            return Some(CancelReason::OutOfRange);
        }
        None
    }
}

//! Value types shared by every interaction module.
//!
//! Identifiers, interaction tags, options, contexts and result codes are plain
//! data. They are created fresh per attempt, passed through events, and (with
//! the `serde` feature) copied across the trust boundary unchanged.
use std::borrow::Cow;
use std::fmt;

use glam::Vec3;

/// Stable identifier of an object in the world arena.
///
/// A reference is live only while the identifier still resolves in the
/// [`World`](crate::World); callers check before every use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hierarchical interaction tag such as `Interaction.Type.Pickup`.
///
/// An "unset" tag is modelled as `Option<InteractionTag>::None`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionTag(Cow<'static, str>);

impl InteractionTag {
    pub const PICKUP: Self = Self::from_static("Interaction.Type.Pickup");
    pub const OPEN: Self = Self::from_static("Interaction.Type.Open");
    pub const USE: Self = Self::from_static("Interaction.Type.Use");
    pub const TALK: Self = Self::from_static("Interaction.Type.Talk");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InteractionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of outcomes for every interaction attempt.
///
/// These codes are the only failure representation that crosses the trust
/// boundary; nothing is ever thrown across it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractionResult {
    Success,
    /// Generic precondition or handler rejection, or a missing target.
    Failed,
    /// Capability disabled or caller invalid.
    NotAllowed,
    /// Authoritative distance check failed.
    OutOfRange,
    /// Channeled session aborted.
    Cancelled,
    /// Request sent to the authority, result pending.
    InProgress,
}

impl InteractionResult {
    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Which side of the trust boundary an [`Interactor`](crate::Interactor) runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Single process, no trust separation. Detects and executes locally.
    Standalone,
    /// Authoritative mirror of a remote requester. Executes, never detects.
    Authority,
    /// Locally controlled, non-authoritative. Detects and forwards requests.
    Requester,
}

impl Role {
    /// Returns true if results produced on this side are final.
    #[inline]
    pub const fn is_authoritative(self) -> bool {
        matches!(self, Self::Standalone | Self::Authority)
    }

    /// Returns true if this side runs candidate detection.
    #[inline]
    pub const fn detects(self) -> bool {
        matches!(self, Self::Standalone | Self::Requester)
    }
}

/// One entry of the prompt a target publishes.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionOption {
    pub kind: InteractionTag,
    pub display_text: String,
    pub priority: i32,
    pub requires_hold: bool,
}

impl InteractionOption {
    pub fn new(kind: InteractionTag, display_text: impl Into<String>) -> Self {
        Self {
            kind,
            display_text: display_text.into(),
            priority: 0,
            requires_hold: false,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn hold(mut self) -> Self {
        self.requires_hold = true;
        self
    }
}

/// Snapshot describing a single attempt, carried by executor events.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionContext {
    pub interactor: EntityId,
    pub target: Option<EntityId>,
    pub kind: Option<InteractionTag>,
    /// Target position at the time the context was built (origin if gone).
    pub location: Vec3,
    /// Interactor-to-target distance (zero if either side is gone).
    pub distance: f32,
}

impl InteractionContext {
    pub fn new(interactor: EntityId, target: Option<EntityId>, kind: Option<InteractionTag>) -> Self {
        Self {
            interactor,
            target,
            kind,
            location: Vec3::ZERO,
            distance: 0.0,
        }
    }

    #[must_use]
    pub fn at(mut self, location: Vec3, distance: f32) -> Self {
        self.location = location;
        self.distance = distance;
        self
    }
}

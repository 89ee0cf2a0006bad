//! Deterministic interaction rules shared by both trust sides.
//!
//! The crate is synchronous and owns no threads. Each process side drives its
//! [`Interactor`]s from a single tick loop over its own [`World`]; the sides
//! reconcile only through the [`protocol`] messages.
pub mod channel;
pub mod config;
pub mod detection;
pub mod error;
pub mod events;
pub mod interactable;
pub mod interactor;
pub mod prompt;
pub mod protocol;
pub mod schedule;
pub mod targeting;
pub mod types;
pub mod world;

pub use channel::{
    CancelPolicy, CancelReason, ChannelLimits, ChannelState, ChannelStep, ChanneledSession,
};
pub use config::InteractionConfig;
pub use detection::{DetectionMode, DetectionStrategy, RadiusDetection, RayDetection};
pub use error::{ChannelError, ConfigError, ErrorSeverity, ValidationError, WorldError};
pub use events::{EventKind, InteractionEvent, Observers, SubscriptionId};
pub use interactable::{Interactable, InteractableEvent, InteractionHandler};
pub use interactor::Interactor;
pub use prompt::Prompt;
pub use protocol::{AuthorityRequest, RequestId, ResultNotify};
pub use schedule::Cadence;
pub use targeting::{
    CandidateScorer, ScoreWeights, TargetChange, TargetTracker, WeightedScorer,
    filter_candidates, select_best,
};
pub use types::{
    EntityId, InteractionContext, InteractionOption, InteractionResult, InteractionTag, Role,
};
pub use world::{
    InteractableSpec, ObjectSpec, Placement, RayHit, SpatialQuery, ViewPoint, World, WorldCommand,
    WorldObject, WorldSnapshot,
};

//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, the wire codec and the world arena
//! so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use interaction_core::{ChannelError, ConfigError, EntityId, WorldError};

pub use crate::transport::CodecError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{worker} worker command channel closed")]
    CommandChannelClosed { worker: &'static str },

    #[error("{worker} worker reply channel closed")]
    ReplyChannelClosed {
        worker: &'static str,
        #[source]
        source: oneshot::error::RecvError,
    },

    #[error("worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("no requester is registered for {0}")]
    UnknownRequester(EntityId),

    #[error("requester {0} has no body in the initial world")]
    MissingInteractor(EntityId),

    #[error("requester {0} registered twice")]
    DuplicateRequester(EntityId),

    #[error("tick rate must be finite and positive with a non-zero period (got {0})")]
    InvalidTickRate(f32),

    #[error("{name} buffer size must be positive")]
    ZeroBuffer { name: &'static str },

    #[error("link to {peer} closed")]
    LinkClosed { peer: &'static str },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

//! Error infrastructure for interaction-core.
//!
//! Internal failures are typed `thiserror` enums. Anything that has to cross
//! the trust boundary is first collapsed into an [`InteractionResult`] code via
//! [`ValidationError::result_code`].

use crate::types::{EntityId, InteractionResult};

/// Severity level of an error, used to pick a log level and recovery strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// Temporary condition; the same attempt may succeed later.
    ///
    /// Examples: target out of range, target disabled
    Recoverable,

    /// Invalid input that should not be retried unchanged.
    ///
    /// Examples: unknown entity, non-positive channel duration
    Validation,

    /// Unexpected state inconsistency (a bug).
    Internal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Level an error of this severity is logged at.
    pub const fn level(&self) -> tracing::Level {
        match self {
            Self::Recoverable => tracing::Level::TRACE,
            Self::Validation => tracing::Level::DEBUG,
            Self::Internal => tracing::Level::WARN,
        }
    }
}

#[doc(hidden)]
pub use tracing as __tracing;

/// Emits a tracing event at the level of an [`ErrorSeverity`].
///
/// ```ignore
/// log_by_severity!(error.severity(), interactor = %id, %error, "interaction rejected");
/// ```
#[macro_export]
macro_rules! log_by_severity {
    ($severity:expr, $($arg:tt)+) => {
        match $severity {
            $crate::ErrorSeverity::Recoverable => $crate::error::__tracing::trace!($($arg)+),
            $crate::ErrorSeverity::Validation => $crate::error::__tracing::debug!($($arg)+),
            $crate::ErrorSeverity::Internal => $crate::error::__tracing::warn!($($arg)+),
        }
    };
}

/// Reasons an interaction attempt fails validation.
///
/// Validation is applied identically on every trust side; only the mapping to
/// a result code depends on whether the validating side is authoritative.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("no target selected")]
    NoTarget,

    #[error("target {target} is not live")]
    TargetMissing { target: EntityId },

    #[error("interactor {interactor} has no world placement")]
    InteractorMissing { interactor: EntityId },

    #[error("target {target} is not interactable or disabled")]
    Disabled { target: EntityId },

    #[error("target {target} is {distance:.1} away (limit {limit:.1})")]
    OutOfRange {
        target: EntityId,
        distance: f32,
        limit: f32,
    },

    #[error("target {target} rejected the interaction precondition")]
    Rejected { target: EntityId },
}

impl ValidationError {
    /// Maps the failure to the code reported to callers.
    ///
    /// `OutOfRange` is an authoritative verdict; a non-authoritative pre-check
    /// reports a distance failure as a generic `Failed`.
    pub fn result_code(&self, authoritative: bool) -> InteractionResult {
        match self {
            Self::NoTarget | Self::TargetMissing { .. } => InteractionResult::Failed,
            Self::InteractorMissing { .. } => InteractionResult::NotAllowed,
            Self::Disabled { .. } => InteractionResult::NotAllowed,
            Self::OutOfRange { .. } if authoritative => InteractionResult::OutOfRange,
            Self::OutOfRange { .. } => InteractionResult::Failed,
            Self::Rejected { .. } => InteractionResult::NotAllowed,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OutOfRange { .. } | Self::Disabled { .. } | Self::Rejected { .. } => {
                ErrorSeverity::Recoverable
            }
            Self::NoTarget | Self::TargetMissing { .. } | Self::InteractorMissing { .. } => {
                ErrorSeverity::Validation
            }
        }
    }
}

/// Reasons a channeled session refuses to start.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("a channeled interaction is already in progress")]
    AlreadyChanneling,

    #[error("channel duration must be positive (got {duration})")]
    InvalidDuration { duration: f32 },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ChannelError {
    pub fn result_code(&self, authoritative: bool) -> InteractionResult {
        match self {
            Self::AlreadyChanneling | Self::InvalidDuration { .. } => InteractionResult::Failed,
            Self::Validation(error) => error.result_code(authoritative),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::AlreadyChanneling => ErrorSeverity::Recoverable,
            Self::InvalidDuration { .. } => ErrorSeverity::Validation,
            Self::Validation(error) => error.severity(),
        }
    }
}

/// Errors raised while mutating the world arena.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    #[error("entity {0} already exists")]
    DuplicateEntity(EntityId),

    #[error("entity {0} has no interactable capability")]
    NotInteractable(EntityId),

    #[error("entity id space exhausted")]
    IdsExhausted,
}

impl WorldError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownEntity(_) | Self::NotInteractable(_) => ErrorSeverity::Validation,
            Self::DuplicateEntity(_) | Self::IdsExhausted => ErrorSeverity::Internal,
        }
    }
}

/// Rejected configuration values.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("interaction range must be positive (got {0})")]
    NonPositiveRange(f32),

    #[error("detection interval must not be negative (got {0})")]
    NegativeInterval(f32),

    #[error("{name} tolerance must be at least 1.0 (got {value})")]
    ToleranceBelowOne { name: &'static str, value: f32 },

    #[error("cancel move threshold must not be negative (got {0})")]
    NegativeMoveThreshold(f32),
}

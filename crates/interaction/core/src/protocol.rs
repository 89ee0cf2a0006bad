//! Messages exchanged across the trust boundary.
//!
//! Requesters send [`AuthorityRequest`]s; the authority answers every
//! request that produces an outcome with a [`ResultNotify`] echoing the
//! request id. Delivery is assumed reliable and in order per requester.
use std::fmt;

use crate::types::{EntityId, InteractionResult, InteractionTag};

/// Correlates a request with its notify. Assigned by the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Requester to authority.
#[derive(Clone, Debug, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthorityRequest {
    Interact {
        request: RequestId,
        target: EntityId,
        kind: Option<InteractionTag>,
    },
    ChannelStart {
        request: RequestId,
        target: EntityId,
        kind: Option<InteractionTag>,
        duration: f32,
    },
    /// Cancels the session opened by `request`; answered by no notify.
    ChannelCancel { request: RequestId },
}

impl AuthorityRequest {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Interact { request, .. }
            | Self::ChannelStart { request, .. }
            | Self::ChannelCancel { request } => *request,
        }
    }

    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// Authority to requester: final outcome of a request.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResultNotify {
    pub request: RequestId,
    pub target: EntityId,
    pub kind: Option<InteractionTag>,
    pub result: InteractionResult,
}

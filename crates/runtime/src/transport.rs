//! Request/notify links between requesters and the authority.
//!
//! Messages cross the boundary as bincode frames over reliable, in-order
//! channels. One inbound queue is shared by all requesters; every requester
//! owns its own notify queue.
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::mpsc;

use interaction_core::{AuthorityRequest, EntityId, ResultNotify};

use crate::api::{Result, RuntimeError};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode {message}")]
    Encode {
        message: &'static str,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to decode {message} ({len} bytes)")]
    Decode {
        message: &'static str,
        len: usize,
        #[source]
        source: bincode::Error,
    },
}

pub fn encode<T: Serialize>(message: &'static str, value: &T) -> std::result::Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|source| CodecError::Encode { message, source })
}

pub fn decode<T: DeserializeOwned>(
    message: &'static str,
    bytes: &[u8],
) -> std::result::Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|source| CodecError::Decode {
        message,
        len: bytes.len(),
        source,
    })
}

/// Encoded request tagged with the connection it arrived on.
///
/// The sender is established by the link, never by the payload.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub from: EntityId,
    pub bytes: Vec<u8>,
}

/// Requester end of the requester-to-authority channel.
#[derive(Debug, Clone)]
pub struct RequestLink {
    from: EntityId,
    tx: mpsc::UnboundedSender<InboundFrame>,
}

impl RequestLink {
    pub fn new(from: EntityId, tx: mpsc::UnboundedSender<InboundFrame>) -> Self {
        Self { from, tx }
    }

    pub fn send(&self, request: &AuthorityRequest) -> Result<()> {
        let bytes = encode("authority request", request)?;
        self.tx
            .send(InboundFrame {
                from: self.from,
                bytes,
            })
            .map_err(|_| RuntimeError::LinkClosed { peer: "authority" })
    }
}

/// Authority end of one requester's notify channel.
#[derive(Debug, Clone)]
pub struct NotifyLink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl NotifyLink {
    pub fn new(tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { tx }
    }

    pub fn send(&self, notify: &ResultNotify) -> Result<()> {
        let bytes = encode("result notify", notify)?;
        self.tx
            .send(bytes)
            .map_err(|_| RuntimeError::LinkClosed { peer: "requester" })
    }
}

pub fn decode_request(frame: &InboundFrame) -> std::result::Result<AuthorityRequest, CodecError> {
    decode("authority request", &frame.bytes)
}

pub fn decode_notify(bytes: &[u8]) -> std::result::Result<ResultNotify, CodecError> {
    decode("result notify", bytes)
}

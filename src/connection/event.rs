//! Asynchronous connection failures.

use serde::Serialize;

use crate::error::Error;
use crate::identifiers::ConnectionId;

/// Failure of an established session, reported once.
///
/// These never surface through `read` or `write`; they are delivered on the
/// connection event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConnectionEvent {
    /// The connected accessory detached.
    #[serde(rename_all = "camelCase")]
    Lost {
        /// Accessory that went away.
        connection_id: ConnectionId,
    },

    /// The stream failed and the session was closed.
    #[serde(rename_all = "camelCase")]
    StreamFailed {
        /// Accessory the session was bound to.
        connection_id: ConnectionId,
        /// Transport's description.
        message: String,
    },

    /// Draining the write queue failed; queued bytes were kept.
    #[serde(rename_all = "camelCase")]
    WriteFailed {
        /// Accessory the session is bound to.
        connection_id: ConnectionId,
        /// Transport's description.
        message: String,
    },
}

impl ConnectionEvent {
    /// Returns the accessory the event concerns.
    #[inline]
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            Self::Lost { connection_id }
            | Self::StreamFailed { connection_id, .. }
            | Self::WriteFailed { connection_id, .. } => *connection_id,
        }
    }

    /// Converts the event into the matching [`Error`].
    #[must_use]
    pub fn to_error(&self) -> Error {
        match self {
            Self::Lost { connection_id } => Error::connection_lost(*connection_id),
            Self::StreamFailed { message, .. } => Error::stream(message.clone()),
            Self::WriteFailed { message, .. } => Error::write_failed(message.clone()),
        }
    }
}

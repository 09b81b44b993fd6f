//! Error types for the accessory serial link.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use classic_serial::{ConnectionId, Result, Serial};
//!
//! async fn example(serial: &Serial) -> Result<()> {
//!     serial.connect(ConnectionId::ANY).await?;
//!     serial.write(b"AT\r\n".to_vec()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::NoMatchingAccessory`], [`Error::AlreadyConnecting`], [`Error::UnsupportedProtocol`], [`Error::OpenFailed`] |
//! | Stream | [`Error::Stream`], [`Error::ConnectionLost`] |
//! | Write | [`Error::WriteFailed`] |
//! | Usage | [`Error::NotConnected`], [`Error::EmptyDelimiter`] |
//! | Selection | [`Error::UserCancelled`], [`Error::SelectionFailed`] |
//! | External | [`Error::Json`], [`Error::ReactorClosed`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::identifiers::ConnectionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the serial link configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// No attached accessory matched the connect request.
    ///
    /// Returned by `connect` when the id is unknown, or when the sentinel
    /// [`ConnectionId::ANY`] finds no accessory speaking a supported protocol.
    #[error("No matching accessory for connection id {connection_id}")]
    NoMatchingAccessory {
        /// The connection id that was requested.
        connection_id: ConnectionId,
    },

    /// A session is already open.
    ///
    /// Only one session may exist per process.
    #[error("A session is already open with accessory {connection_id}")]
    AlreadyConnecting {
        /// Accessory bound to the existing session.
        connection_id: ConnectionId,
    },

    /// The accessory does not advertise the requested protocol string.
    #[error("Accessory does not support protocol: {protocol}")]
    UnsupportedProtocol {
        /// The protocol string that was requested.
        protocol: String,
    },

    /// Binding the session channels failed at the transport layer.
    #[error("Failed to open session: {message}")]
    OpenFailed {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Stream Errors
    // ========================================================================
    /// Unsolicited transport failure on an open session.
    #[error("Stream error: {message}")]
    Stream {
        /// Description of the stream failure.
        message: String,
    },

    /// The connected accessory detached.
    #[error("Connection lost with accessory {connection_id}")]
    ConnectionLost {
        /// Accessory that went away.
        connection_id: ConnectionId,
    },

    // ========================================================================
    // Write Errors
    // ========================================================================
    /// A drain of the outbound queue failed at the transport.
    ///
    /// Queued bytes are preserved.
    #[error("Write failed: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// Operation requires an open session.
    #[error("Not connected")]
    NotConnected,

    /// A delimiter must contain at least one byte.
    #[error("Delimiter must not be empty")]
    EmptyDelimiter,

    // ========================================================================
    // Selection Errors
    // ========================================================================
    /// The user dismissed the accessory picker.
    #[error("Accessory selection cancelled by user")]
    UserCancelled,

    /// The accessory picker failed.
    #[error("Accessory selection failed: {message}")]
    SelectionFailed {
        /// Description reported by the picker.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// The reactor task has stopped.
    #[error("Serial reactor closed")]
    ReactorClosed,

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a no matching accessory error.
    #[inline]
    pub fn no_matching_accessory(connection_id: ConnectionId) -> Self {
        Self::NoMatchingAccessory { connection_id }
    }

    /// Creates an already connecting error.
    #[inline]
    pub fn already_connecting(connection_id: ConnectionId) -> Self {
        Self::AlreadyConnecting { connection_id }
    }

    /// Creates an unsupported protocol error.
    #[inline]
    pub fn unsupported_protocol(protocol: impl Into<String>) -> Self {
        Self::UnsupportedProtocol {
            protocol: protocol.into(),
        }
    }

    /// Creates an open failed error.
    #[inline]
    pub fn open_failed(message: impl Into<String>) -> Self {
        Self::OpenFailed {
            message: message.into(),
        }
    }

    /// Creates a stream error.
    #[inline]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Creates a connection lost error.
    #[inline]
    pub fn connection_lost(connection_id: ConnectionId) -> Self {
        Self::ConnectionLost { connection_id }
    }

    /// Creates a write failed error.
    #[inline]
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a selection failed error.
    #[inline]
    pub fn selection_failed(message: impl Into<String>) -> Self {
        Self::SelectionFailed {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error was raised while establishing a session.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NoMatchingAccessory { .. }
                | Self::AlreadyConnecting { .. }
                | Self::UnsupportedProtocol { .. }
                | Self::OpenFailed { .. }
        )
    }

    /// Returns `true` if this error tore down an open session.
    #[inline]
    #[must_use]
    pub fn is_stream_error(&self) -> bool {
        matches!(self, Self::Stream { .. } | Self::ConnectionLost { .. })
    }

    /// Returns `true` if the operation was invoked in the wrong state or
    /// with an invalid argument.
    #[inline]
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::NotConnected | Self::EmptyDelimiter)
    }
}

// ============================================================================
// Tests
// ============================================================================

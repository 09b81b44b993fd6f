//! Transport boundary.
//!
//! The platform layer that actually talks to the accessory implements
//! [`AccessoryTransport`]. Opening a session yields [`SessionChannels`] for
//! output and a [`SessionEvents`] sender through which the platform reports
//! readable data, free output capacity and stream failures.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   open_session    ┌──────────────────┐
//! │ StreamSession  │──────────────────►│ AccessoryTransport│
//! │                │◄── write/close ───│ SessionChannels   │
//! │                │                   │                   │
//! │   (reactor)    │◄── SessionEvents ─│ platform stream   │
//! └────────────────┘   StreamEvent     └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `memory` | In-process transport with a scriptable peer |

// ============================================================================
// Submodules
// ============================================================================

/// In-process transport with a scriptable peer.
pub mod memory;

// ============================================================================
// Imports
// ============================================================================

use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::accessory::Accessory;
use crate::identifiers::SessionId;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryPeer, MemoryTransport};

// ============================================================================
// StreamEvent
// ============================================================================

/// Event reported by an open session's streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Both channels finished opening.
    OpenCompleted,
    /// The input channel produced bytes.
    Received(Vec<u8>),
    /// The output channel can accept up to this many bytes.
    SpaceAvailable(usize),
    /// The stream failed.
    ErrorOccurred(String),
    /// The remote end closed the stream.
    EndEncountered,
}

/// A [`StreamEvent`] tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSignal {
    /// Session that emitted the event.
    pub session_id: SessionId,
    /// The event itself.
    pub event: StreamEvent,
}

// ============================================================================
// SessionEvents
// ============================================================================

/// Event sender bound to one session.
///
/// Handed to [`AccessoryTransport::open_session`]; the platform keeps it for
/// as long as the streams are alive.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    session_id: SessionId,
    tx: mpsc::UnboundedSender<SessionSignal>,
}

impl SessionEvents {
    pub(crate) fn new(session_id: SessionId, tx: mpsc::UnboundedSender<SessionSignal>) -> Self {
        Self { session_id, tx }
    }

    /// Returns the session these events belong to.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Emits an event. Returns `false` if the reactor has stopped.
    pub fn emit(&self, event: StreamEvent) -> bool {
        self.tx
            .send(SessionSignal {
                session_id: self.session_id,
                event,
            })
            .is_ok()
    }

    /// Reports bytes read from the input channel.
    #[inline]
    pub fn received(&self, bytes: impl Into<Vec<u8>>) -> bool {
        self.emit(StreamEvent::Received(bytes.into()))
    }

    /// Reports free capacity on the output channel.
    #[inline]
    pub fn space_available(&self, capacity: usize) -> bool {
        self.emit(StreamEvent::SpaceAvailable(capacity))
    }

    /// Reports a stream failure.
    #[inline]
    pub fn error(&self, message: impl Into<String>) -> bool {
        self.emit(StreamEvent::ErrorOccurred(message.into()))
    }

    /// Reports that the remote end closed the stream.
    #[inline]
    pub fn end(&self) -> bool {
        self.emit(StreamEvent::EndEncountered)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Output side of an open session.
///
/// `write` follows [`io::Write`] semantics: it may accept fewer bytes than
/// offered, `Ok(0)` or [`io::ErrorKind::WouldBlock`] mean no capacity right
/// now.
pub trait SessionChannels: Write + Send {
    /// Tears down both input and output channels.
    fn close(&mut self);
}

/// Opens byte-stream sessions on attached accessories.
pub trait AccessoryTransport: Send {
    /// Binds input and output channels for `protocol` on `accessory`.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the channels cannot be bound.
    fn open_session(
        &mut self,
        accessory: &Accessory,
        protocol: &str,
        events: SessionEvents,
    ) -> io::Result<Box<dyn SessionChannels>>;
}

// ============================================================================
// Tests
// ============================================================================

//! In-process transport with a scriptable peer.
//!
//! [`MemoryTransport`] stands in for the platform stream layer. The matching
//! [`MemoryPeer`] plays the accessory: it pushes inbound bytes, grants output
//! capacity, injects failures and records what the session wrote.
//!
//! # Example
//!
//! ```ignore
//! let (transport, peer) = MemoryTransport::pair();
//! let serial = Serial::builder()
//!     .supported_protocol("com.example.serial")
//!     .transport(transport)
//!     .spawn()?;
//!
//! serial.connect(ConnectionId::ANY).await?;
//! peer.send(b"OK\n");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::io::{self, ErrorKind, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::accessory::Accessory;
use crate::identifiers::{ConnectionId, SessionId};

use super::{AccessoryTransport, SessionChannels, SessionEvents, StreamEvent};

// ============================================================================
// Link
// ============================================================================

/// State shared between the transport, its channels and the peer.
#[derive(Debug, Default)]
struct Link {
    /// Events of the currently open session.
    events: Option<SessionEvents>,
    /// Bytes accepted from the session.
    written: Vec<u8>,
    /// Error returned by the next `open_session`.
    open_error: Option<String>,
    /// Error returned by every write until cleared.
    write_error: Option<ErrorKind>,
    /// Accessory and protocol of every successful open.
    opened: Vec<(ConnectionId, String)>,
}

impl Link {
    fn is_current(&self, session_id: SessionId) -> bool {
        self.events
            .as_ref()
            .is_some_and(|events| events.session_id() == session_id)
    }
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// Transport whose streams live in memory.
#[derive(Debug)]
pub struct MemoryTransport {
    link: Arc<Mutex<Link>>,
}

impl MemoryTransport {
    /// Creates a transport and the peer that drives it.
    #[must_use]
    pub fn pair() -> (Self, MemoryPeer) {
        let link = Arc::new(Mutex::new(Link::default()));
        (
            Self {
                link: Arc::clone(&link),
            },
            MemoryPeer { link },
        )
    }
}

impl AccessoryTransport for MemoryTransport {
    fn open_session(
        &mut self,
        accessory: &Accessory,
        protocol: &str,
        events: SessionEvents,
    ) -> io::Result<Box<dyn SessionChannels>> {
        let mut link = self.link.lock();

        if let Some(message) = link.open_error.take() {
            return Err(io::Error::new(ErrorKind::ConnectionRefused, message));
        }

        let session_id = events.session_id();
        link.events = Some(events.clone());
        link.opened.push((accessory.connection_id, protocol.to_string()));
        drop(link);

        debug!(
            %session_id,
            connection_id = %accessory.connection_id,
            protocol,
            "Memory session opened"
        );
        events.emit(StreamEvent::OpenCompleted);

        Ok(Box::new(MemoryChannels {
            link: Arc::clone(&self.link),
            session_id,
        }))
    }
}

// ============================================================================
// MemoryChannels
// ============================================================================

/// Output channel of one memory session.
struct MemoryChannels {
    link: Arc<Mutex<Link>>,
    session_id: SessionId,
}

impl Write for MemoryChannels {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut link = self.link.lock();

        if !link.is_current(self.session_id) {
            return Err(io::Error::new(ErrorKind::NotConnected, "session closed"));
        }
        if let Some(kind) = link.write_error {
            return Err(io::Error::new(kind, "injected write failure"));
        }

        link.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SessionChannels for MemoryChannels {
    fn close(&mut self) {
        let mut link = self.link.lock();
        if link.is_current(self.session_id) {
            link.events = None;
            debug!(session_id = %self.session_id, "Memory session closed");
        }
    }
}

// ============================================================================
// MemoryPeer
// ============================================================================

/// The accessory end of a [`MemoryTransport`].
///
/// Every push returns `false` when no session is open.
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    link: Arc<Mutex<Link>>,
}

impl MemoryPeer {
    /// Returns the open session's event sender, if any.
    fn events(&self) -> Option<SessionEvents> {
        self.link.lock().events.clone()
    }

    /// Delivers inbound bytes to the session.
    pub fn send(&self, bytes: impl Into<Vec<u8>>) -> bool {
        self.events().is_some_and(|events| events.received(bytes))
    }

    /// Grants `capacity` bytes of output space.
    pub fn grant(&self, capacity: usize) -> bool {
        self.events()
            .is_some_and(|events| events.space_available(capacity))
    }

    /// Reports a stream error.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.events().is_some_and(|events| events.error(message))
    }

    /// Reports end of stream.
    pub fn end(&self) -> bool {
        self.events().is_some_and(|events| events.end())
    }

    /// Makes the next `open_session` fail with `message`.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.link.lock().open_error = Some(message.into());
    }

    /// Makes writes fail with `kind` until called again with `None`.
    pub fn fail_writes(&self, kind: Option<ErrorKind>) {
        self.link.lock().write_error = kind;
    }

    /// Returns `true` while a session is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.link.lock().events.is_some()
    }

    /// Returns a copy of everything written so far.
    #[must_use]
    pub fn written(&self) -> Vec<u8> {
        self.link.lock().written.clone()
    }

    /// Drains everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.link.lock().written)
    }

    /// Returns accessory and protocol of every successful open.
    #[must_use]
    pub fn opened(&self) -> Vec<(ConnectionId, String)> {
        self.link.lock().opened.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

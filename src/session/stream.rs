//! Stream session state machine.
//!
//! A [`StreamSession`] binds one accessory under one protocol string. It owns
//! the read buffer, the write queue and the transport channels, and turns
//! transport events into buffer updates.
//!
//! # Event Handling
//!
//! | Event | Effect |
//! |-------|--------|
//! | `Received` | append to read buffer, then deliver subscribed records |
//! | `SpaceAvailable` | drain the write queue up to the reported capacity |
//! | `ErrorOccurred` / `EndEncountered` | close the session, return a stream error |
//!
//! # Write Failures
//!
//! A failed drain keeps the queued bytes and holds further draining. The
//! failure is returned once from the next `write`, which re-arms draining;
//! the bytes passed to that `write` are not queued.
//!
//! # Write Credit
//!
//! Capacity reported by `SpaceAvailable` that the queue could not use is kept
//! as credit. [`StreamSession::flush`] spends it after a `write`, so a
//! transport that reports space once and then waits for data never stalls
//! the queue.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::accessory::Accessory;
use crate::buffer::{ByteBuffer, WriteQueue};
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::transport::{
    AccessoryTransport, SessionChannels, SessionEvents, SessionSignal, StreamEvent,
};

use super::state::SessionState;
use super::subscription::SubscriptionHub;

// ============================================================================
// OpenSession
// ============================================================================

/// Everything that exists only while the session is open.
struct OpenSession {
    session_id: SessionId,
    accessory: Accessory,
    protocol: String,
    channels: Box<dyn SessionChannels>,
    read_buffer: ByteBuffer,
    write_queue: WriteQueue,
    /// Latched drain failure; draining is held while set.
    write_fault: Option<String>,
    /// Unused output capacity from the last writable event.
    write_credit: usize,
}

impl OpenSession {
    /// Drains up to `capacity` bytes and records what is left as credit.
    fn drain(&mut self, capacity: usize) -> Result<usize> {
        match self.write_queue.drain(&mut self.channels, capacity) {
            Ok(written) => {
                // A queue that still holds bytes means the channel is full
                self.write_credit = if self.write_queue.is_empty() {
                    capacity.saturating_sub(written)
                } else {
                    0
                };
                Ok(written)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    session_id = %self.session_id,
                    pending = self.write_queue.pending_bytes(),
                    error = %e,
                    "Write drain failed"
                );
                self.write_credit = 0;
                self.write_fault = Some(message.clone());
                Err(Error::write_failed(message))
            }
        }
    }
}

// ============================================================================
// StreamSession
// ============================================================================

/// The process-wide byte-stream session.
pub struct StreamSession {
    transport: Box<dyn AccessoryTransport>,
    signals: mpsc::UnboundedSender<SessionSignal>,
    hub: SubscriptionHub,
    connected: Arc<AtomicBool>,
    state: SessionState,
    open: Option<OpenSession>,
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &self.state)
            .field("session_id", &self.session_id())
            .field("buffered", &self.buffered_len())
            .field("pending_write", &self.pending_write_bytes())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// StreamSession - Constructor
// ============================================================================

impl StreamSession {
    /// Creates a closed session.
    ///
    /// Transport events of every session opened later are sent to `signals`.
    pub fn new(
        transport: Box<dyn AccessoryTransport>,
        signals: mpsc::UnboundedSender<SessionSignal>,
        hub: SubscriptionHub,
    ) -> Self {
        Self {
            transport,
            signals,
            hub,
            connected: Arc::new(AtomicBool::new(false)),
            state: SessionState::Closed,
            open: None,
        }
    }

    /// Returns the shared flag mirroring [`is_open`](Self::is_open).
    #[must_use]
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }
}

// ============================================================================
// StreamSession - Accessors
// ============================================================================

impl StreamSession {
    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` if the session is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Returns the connected accessory.
    #[inline]
    #[must_use]
    pub fn accessory(&self) -> Option<&Accessory> {
        self.open.as_ref().map(|open| &open.accessory)
    }

    /// Returns the protocol string the session was opened with.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.open.as_ref().map(|open| open.protocol.as_str())
    }

    /// Returns the id of the open session.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.open.as_ref().map(|open| open.session_id)
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.open.as_ref().map_or(0, |open| open.read_buffer.len())
    }

    /// Returns the number of queued, unsent bytes.
    #[must_use]
    pub fn pending_write_bytes(&self) -> usize {
        self.open
            .as_ref()
            .map_or(0, |open| open.write_queue.pending_bytes())
    }

    fn open_mut(&mut self) -> Result<&mut OpenSession> {
        self.open.as_mut().ok_or(Error::NotConnected)
    }
}

// ============================================================================
// StreamSession - Open / Close
// ============================================================================

impl StreamSession {
    /// Binds channels for `protocol` on `accessory`.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnecting`] if a session is already open
    /// - [`Error::UnsupportedProtocol`] if the accessory does not list `protocol`
    /// - [`Error::OpenFailed`] if the transport cannot bind the channels
    pub fn open(&mut self, accessory: Accessory, protocol: &str) -> Result<()> {
        if let Some(open) = &self.open {
            return Err(Error::already_connecting(open.accessory.connection_id));
        }
        if !accessory.supports(protocol) {
            return Err(Error::unsupported_protocol(protocol));
        }

        self.state = SessionState::Opening;
        let session_id = SessionId::generate();
        let events = SessionEvents::new(session_id, self.signals.clone());

        let channels = match self.transport.open_session(&accessory, protocol, events) {
            Ok(channels) => channels,
            Err(e) => {
                self.state = SessionState::Closed;
                warn!(
                    connection_id = %accessory.connection_id,
                    protocol,
                    error = %e,
                    "Failed to open session"
                );
                return Err(Error::open_failed(e.to_string()));
            }
        };

        info!(
            %session_id,
            connection_id = %accessory.connection_id,
            name = %accessory.name,
            protocol,
            "Session opened"
        );

        // A fresh session never inherits a subscription
        self.hub.unsubscribe();
        self.open = Some(OpenSession {
            session_id,
            accessory,
            protocol: protocol.to_string(),
            channels,
            read_buffer: ByteBuffer::new(),
            write_queue: WriteQueue::new(),
            write_fault: None,
            write_credit: 0,
        });
        self.state = SessionState::Open;
        self.connected.store(true, Ordering::Release);

        Ok(())
    }

    /// Tears down the channels. No-op when already closed.
    ///
    /// Unread bytes, unsent bytes and the subscription are dropped.
    pub fn close(&mut self) {
        let Some(mut open) = self.open.take() else {
            return;
        };

        self.state = SessionState::Closing;
        self.connected.store(false, Ordering::Release);
        open.channels.close();
        self.hub.unsubscribe();
        self.state = SessionState::Closed;

        info!(
            session_id = %open.session_id,
            connection_id = %open.accessory.connection_id,
            unread = open.read_buffer.len(),
            unsent = open.write_queue.pending_bytes(),
            "Session closed"
        );
    }
}

// ============================================================================
// StreamSession - Data Operations
// ============================================================================

impl StreamSession {
    /// Appends inbound bytes and delivers subscribed records.
    ///
    /// Returns the number of records delivered.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not open
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<usize> {
        let hub = self.hub.clone();
        let open = self.open_mut()?;

        open.read_buffer.append(bytes);
        let delivered = hub.react(&mut open.read_buffer);

        trace!(
            received = bytes.len(),
            delivered,
            buffered = open.read_buffer.len(),
            "Ingested bytes"
        );
        Ok(delivered)
    }

    /// Drains and returns every unread byte.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not open
    pub fn read(&mut self) -> Result<Vec<u8>> {
        Ok(self.open_mut()?.read_buffer.take_all())
    }

    /// Returns the record terminated by `delimiter`, or empty bytes if no
    /// complete record is buffered yet.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDelimiter`] if `delimiter` is empty
    /// - [`Error::NotConnected`] if the session is not open
    pub fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        if delimiter.is_empty() {
            return Err(Error::EmptyDelimiter);
        }
        let open = self.open_mut()?;
        Ok(open.read_buffer.read_until(delimiter).unwrap_or_default())
    }

    /// Queues bytes for transmission.
    ///
    /// Sending happens in [`flush`](Self::flush) or on the next writable
    /// event.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not open
    /// - [`Error::WriteFailed`] once after a failed drain; `bytes` is not
    ///   queued and draining resumes on the next writable event
    pub fn write(&mut self, bytes: Vec<u8>) -> Result<()> {
        let open = self.open_mut()?;

        if let Some(message) = open.write_fault.take() {
            debug!(session_id = %open.session_id, "Write fault reported, draining re-armed");
            return Err(Error::write_failed(message));
        }

        open.write_queue.enqueue(bytes);
        Ok(())
    }

    /// Discards every unread byte.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not open
    pub fn clear(&mut self) -> Result<()> {
        self.open_mut()?.read_buffer.clear();
        Ok(())
    }

    /// Delivers records already resident in the read buffer.
    ///
    /// Returns the number of records delivered; zero when closed.
    pub fn scan_resident(&mut self) -> usize {
        let hub = self.hub.clone();
        self.open
            .as_mut()
            .map_or(0, |open| hub.react(&mut open.read_buffer))
    }

    /// Drains the write queue up to `capacity` bytes.
    ///
    /// Returns the number of bytes written. While a write fault is latched
    /// nothing is drained and `capacity` is kept as credit.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not open
    /// - [`Error::WriteFailed`] if the channel rejected the write
    pub fn on_writable(&mut self, capacity: usize) -> Result<usize> {
        let open = self.open_mut()?;

        if open.write_fault.is_some() {
            trace!(session_id = %open.session_id, capacity, "Draining held by write fault");
            open.write_credit = capacity;
            return Ok(0);
        }

        open.drain(capacity)
    }

    /// Spends write credit left over from earlier writable events.
    ///
    /// Returns the number of bytes written; zero when there is no credit,
    /// nothing is queued or a write fault is latched.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not open
    /// - [`Error::WriteFailed`] if the channel rejected the write
    pub fn flush(&mut self) -> Result<usize> {
        let open = self.open_mut()?;

        if open.write_fault.is_some() || open.write_credit == 0 || open.write_queue.is_empty() {
            return Ok(0);
        }

        let credit = open.write_credit;
        trace!(session_id = %open.session_id, credit, "Spending write credit");
        open.drain(credit)
    }

    /// Returns the unused capacity kept from writable events.
    #[must_use]
    pub fn write_credit(&self) -> usize {
        self.open.as_ref().map_or(0, |open| open.write_credit)
    }
}

// ============================================================================
// StreamSession - Event Dispatch
// ============================================================================

impl StreamSession {
    /// Applies one transport event.
    ///
    /// Events from a session other than the open one are dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::Stream`] if the stream failed; the session is closed
    /// - [`Error::WriteFailed`] if draining failed; the session stays open
    pub fn handle_event(&mut self, signal: SessionSignal) -> Result<()> {
        if self.session_id() != Some(signal.session_id) {
            debug!(session_id = %signal.session_id, "Dropping event from stale session");
            return Ok(());
        }

        match signal.event {
            StreamEvent::OpenCompleted => {
                debug!(session_id = %signal.session_id, "Streams open");
                Ok(())
            }
            StreamEvent::Received(bytes) => self.ingest(&bytes).map(|_| ()),
            StreamEvent::SpaceAvailable(capacity) => self.on_writable(capacity).map(|_| ()),
            StreamEvent::ErrorOccurred(message) => Err(self.fail(message)),
            StreamEvent::EndEncountered => Err(self.fail("end of stream")),
        }
    }

    /// Closes after an unsolicited stream failure.
    fn fail(&mut self, message: impl Into<String>) -> Error {
        let message = message.into();
        warn!(session_id = ?self.session_id(), error = %message, "Stream failed");
        self.close();
        Error::stream(message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    use parking_lot::Mutex;

    use crate::identifiers::ConnectionId;
    use crate::transport::{MemoryPeer, MemoryTransport};

    const PROTOCOL: &str = "com.example.serial";

    struct Fixture {
        session: StreamSession,
        signals: mpsc::UnboundedReceiver<SessionSignal>,
        peer: MemoryPeer,
        hub: SubscriptionHub,
    }

    impl Fixture {
        fn new() -> Self {
            let (transport, peer) = MemoryTransport::pair();
            let (tx, signals) = mpsc::unbounded_channel();
            let hub = SubscriptionHub::new();
            let session = StreamSession::new(Box::new(transport), tx, hub.clone());
            Self {
                session,
                signals,
                peer,
                hub,
            }
        }

        fn opened() -> Self {
            let mut fixture = Self::new();
            fixture
                .session
                .open(accessory(), PROTOCOL)
                .expect("open session");
            fixture.pump().expect("open completed");
            fixture
        }

        /// Applies every queued transport event.
        fn pump(&mut self) -> Result<()> {
            while let Ok(signal) = self.signals.try_recv() {
                self.session.handle_event(signal)?;
            }
            Ok(())
        }
    }

    fn accessory() -> Accessory {
        Accessory::new(3, "Scanner").with_protocol(PROTOCOL)
    }

    #[test]
    fn test_open_and_close() {
        let mut fx = Fixture::new();
        let flag = fx.session.connected_flag();
        assert_eq!(fx.session.state(), SessionState::Closed);

        fx.session.open(accessory(), PROTOCOL).expect("open");
        assert_eq!(fx.session.state(), SessionState::Open);
        assert_eq!(fx.session.protocol(), Some(PROTOCOL));
        assert!(flag.load(Ordering::Acquire));
        assert!(fx.peer.is_open());

        fx.session.close();
        assert_eq!(fx.session.state(), SessionState::Closed);
        assert!(!flag.load(Ordering::Acquire));
        assert!(!fx.peer.is_open());

        // Idempotent
        fx.session.close();
        assert_eq!(fx.session.state(), SessionState::Closed);
    }

    #[test]
    fn test_open_twice_rejected() {
        let mut fx = Fixture::opened();
        let first = fx.session.session_id();

        let other = Accessory::new(4, "Other").with_protocol(PROTOCOL);
        let err = fx.session.open(other, PROTOCOL).expect_err("second open");
        assert!(matches!(
            err,
            Error::AlreadyConnecting { connection_id } if connection_id == ConnectionId::new(3)
        ));
        assert_eq!(fx.session.session_id(), first);
    }

    #[test]
    fn test_open_unsupported_protocol() {
        let mut fx = Fixture::new();
        let err = fx
            .session
            .open(accessory(), "com.other")
            .expect_err("unsupported");
        assert!(matches!(err, Error::UnsupportedProtocol { .. }));
        assert_eq!(fx.session.state(), SessionState::Closed);
    }

    #[test]
    fn test_open_failure_returns_to_closed() {
        let mut fx = Fixture::new();
        fx.peer.fail_next_open("channel refused");

        let err = fx.session.open(accessory(), PROTOCOL).expect_err("bind fails");
        assert!(matches!(err, Error::OpenFailed { .. }));
        assert_eq!(fx.session.state(), SessionState::Closed);
        assert!(!fx.session.is_open());
    }

    #[test]
    fn test_operations_require_open() {
        let mut fx = Fixture::new();
        assert!(matches!(fx.session.read(), Err(Error::NotConnected)));
        assert!(matches!(fx.session.read_until(b"\n"), Err(Error::NotConnected)));
        assert!(matches!(fx.session.write(b"x".to_vec()), Err(Error::NotConnected)));
        assert!(matches!(fx.session.clear(), Err(Error::NotConnected)));
        assert!(matches!(fx.session.ingest(b"x"), Err(Error::NotConnected)));
    }

    #[test]
    fn test_read_drains_buffer() {
        let mut fx = Fixture::opened();
        fx.peer.send(vec![0x43, 0x0A, 0x44]);
        fx.pump().expect("pump");

        assert_eq!(fx.session.read().expect("read"), vec![0x43, 0x0A, 0x44]);
        assert_eq!(fx.session.buffered_len(), 0);
        assert!(fx.session.read().expect("read").is_empty());
    }

    #[test]
    fn test_read_until() {
        let mut fx = Fixture::opened();
        assert!(fx.session.read_until(&[0x0A]).expect("empty").is_empty());

        fx.session.ingest(&[0x43, 0x0A, 0x44]).expect("ingest");
        assert_eq!(fx.session.read_until(&[0x0A]).expect("record"), vec![0x43, 0x0A]);
        assert!(fx.session.read_until(&[0x0A]).expect("no record").is_empty());
        assert_eq!(fx.session.read().expect("rest"), vec![0x44]);
    }

    #[test]
    fn test_read_until_empty_delimiter() {
        let mut fx = Fixture::opened();
        assert!(matches!(fx.session.read_until(b""), Err(Error::EmptyDelimiter)));
    }

    #[test]
    fn test_subscription_delivery_removes_bytes() {
        let mut fx = Fixture::opened();
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        fx.hub
            .subscribe(vec![0x0A], move |record| sink.lock().push(record))
            .expect("subscribe");

        fx.peer.send(vec![0x43, 0x0A, 0x44]);
        fx.pump().expect("pump");

        assert_eq!(*records.lock(), vec![vec![0x43, 0x0A]]);
        assert_eq!(fx.session.read().expect("read"), vec![0x44]);
    }

    #[test]
    fn test_scan_resident_delivers_existing_records() {
        let mut fx = Fixture::opened();
        fx.session.ingest(b"a\nb").expect("ingest");

        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        fx.hub
            .subscribe(b"\n".to_vec(), move |record| sink.lock().push(record))
            .expect("subscribe");
        assert!(records.lock().is_empty());

        assert_eq!(fx.session.scan_resident(), 1);
        assert_eq!(*records.lock(), vec![b"a\n".to_vec()]);
    }

    #[test]
    fn test_write_drains_on_space_available() {
        let mut fx = Fixture::opened();
        fx.session.write(vec![0x41, 0x42]).expect("write");
        assert_eq!(fx.session.pending_write_bytes(), 2);
        assert!(fx.peer.written().is_empty());

        fx.peer.grant(2);
        fx.pump().expect("pump");
        assert_eq!(fx.peer.written(), vec![0x41, 0x42]);
        assert_eq!(fx.session.pending_write_bytes(), 0);
    }

    #[test]
    fn test_write_fault_latched_then_rearmed() {
        let mut fx = Fixture::opened();
        fx.session.write(b"abc".to_vec()).expect("write");

        fx.peer.fail_writes(Some(ErrorKind::BrokenPipe));
        let err = fx.session.on_writable(16).expect_err("drain fails");
        assert!(matches!(err, Error::WriteFailed { .. }));
        assert_eq!(fx.session.pending_write_bytes(), 3);

        // Held until the fault is surfaced to a writer
        fx.peer.fail_writes(None);
        assert_eq!(fx.session.on_writable(16).expect("held"), 0);

        let err = fx.session.write(b"def".to_vec()).expect_err("fault surfaced");
        assert!(matches!(err, Error::WriteFailed { .. }));
        assert_eq!(fx.session.pending_write_bytes(), 3);

        assert_eq!(fx.session.on_writable(16).expect("drain"), 3);
        assert_eq!(fx.peer.written(), b"abc");
        assert!(fx.session.is_open());
    }

    #[test]
    fn test_stream_error_closes_session() {
        let mut fx = Fixture::opened();
        fx.session.ingest(b"unread").expect("ingest");
        fx.hub.subscribe(b"\n".to_vec(), |_| {}).expect("subscribe");

        fx.peer.fail("channel reset");
        let err = fx.pump().expect_err("stream error");
        assert!(matches!(err, Error::Stream { ref message } if message == "channel reset"));
        assert_eq!(fx.session.state(), SessionState::Closed);
        assert!(!fx.hub.is_active());
        assert!(matches!(fx.session.read(), Err(Error::NotConnected)));
    }

    #[test]
    fn test_end_of_stream_closes_session() {
        let mut fx = Fixture::opened();
        fx.peer.end();
        let err = fx.pump().expect_err("end of stream");
        assert!(err.is_stream_error());
        assert!(!fx.session.is_open());
    }

    #[test]
    fn test_stale_events_dropped() {
        let mut fx = Fixture::opened();
        let stale = fx.session.session_id().expect("open");
        fx.session.close();
        fx.session.open(accessory(), PROTOCOL).expect("reopen");
        fx.pump().expect("pump");

        let signal = SessionSignal {
            session_id: stale,
            event: StreamEvent::Received(b"old".to_vec()),
        };
        fx.session.handle_event(signal).expect("dropped");
        assert_eq!(fx.session.buffered_len(), 0);
    }

    #[test]
    fn test_credit_from_early_grant_spent_on_flush() {
        let mut fx = Fixture::opened();
        fx.peer.grant(16);
        fx.pump().expect("pump");
        assert_eq!(fx.session.write_credit(), 16);

        fx.session.write(b"AB".to_vec()).expect("write");
        assert_eq!(fx.session.flush().expect("flush"), 2);
        assert_eq!(fx.peer.written(), b"AB");
        assert_eq!(fx.session.pending_write_bytes(), 0);
        assert_eq!(fx.session.write_credit(), 14);
    }

    #[test]
    fn test_flush_bounded_by_credit() {
        let mut fx = Fixture::opened();
        assert_eq!(fx.session.flush().expect("no credit"), 0);

        fx.peer.grant(2);
        fx.pump().expect("pump");
        fx.session.write(b"abcd".to_vec()).expect("write");

        assert_eq!(fx.session.flush().expect("flush"), 2);
        assert_eq!(fx.peer.written(), b"ab");
        assert_eq!(fx.session.pending_write_bytes(), 2);
        assert_eq!(fx.session.write_credit(), 0);
        assert_eq!(fx.session.flush().expect("spent"), 0);
    }

    #[test]
    fn test_credit_kept_while_fault_latched() {
        let mut fx = Fixture::opened();
        fx.session.write(b"abc".to_vec()).expect("write");

        fx.peer.fail_writes(Some(ErrorKind::BrokenPipe));
        fx.peer.grant(16);
        assert!(matches!(fx.pump(), Err(Error::WriteFailed { .. })));
        assert_eq!(fx.session.write_credit(), 0);

        // Transport recovers and reports space once while the fault is latched
        fx.peer.fail_writes(None);
        fx.peer.grant(16);
        fx.pump().expect("held");
        assert!(fx.peer.written().is_empty());
        assert_eq!(fx.session.write_credit(), 16);

        let err = fx.session.write(b"def".to_vec()).expect_err("fault surfaced");
        assert!(matches!(err, Error::WriteFailed { .. }));
        assert_eq!(fx.session.flush().expect("flush"), 3);
        assert_eq!(fx.peer.written(), b"abc");
        assert_eq!(fx.session.pending_write_bytes(), 0);
    }

    #[test]
    fn test_delimiter_split_across_ingests() {
        let mut fx = Fixture::opened();
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        fx.hub
            .subscribe(b"\r\n".to_vec(), move |record| sink.lock().push(record))
            .expect("subscribe");

        assert_eq!(fx.session.ingest(b"ab\r").expect("ingest"), 0);
        assert_eq!(fx.session.ingest(b"\ncd\r\n").expect("ingest"), 2);

        assert_eq!(*records.lock(), vec![b"ab\r\n".to_vec(), b"cd\r\n".to_vec()]);
        assert_eq!(fx.session.buffered_len(), 0);
    }

    #[test]
    fn test_read_until_split_delimiter() {
        let mut fx = Fixture::opened();
        fx.peer.send(b"ab\r".to_vec());
        fx.pump().expect("pump");
        assert!(fx.session.read_until(b"\r\n").expect("partial").is_empty());

        fx.peer.send(b"\ncd".to_vec());
        fx.pump().expect("pump");
        assert_eq!(fx.session.read_until(b"\r\n").expect("record"), b"ab\r\n");
        assert_eq!(fx.session.read().expect("rest"), b"cd");
    }

    #[test]
    fn test_open_drops_subscription_installed_while_closed() {
        let mut fx = Fixture::new();
        fx.hub.subscribe(b"\n".to_vec(), |_| {}).expect("subscribe");

        fx.session.open(accessory(), PROTOCOL).expect("open");
        assert!(!fx.hub.is_active());

        fx.session.ingest(b"a\n").expect("ingest");
        assert_eq!(fx.session.read().expect("read"), b"a\n");
    }
}

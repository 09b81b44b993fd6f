//! Attach/detach handling and session orchestration.
//!
//! [`ConnectionLifecycle`] is the single owner of the [`StreamSession`]. It
//! keeps the table of attached accessories in attach order, picks the
//! accessory and protocol for `connect`, and turns unsolicited failures into
//! [`ConnectionEvent`]s.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::accessory::{Accessory, AccessoryEvent, Discovery};
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::session::StreamSession;
use crate::transport::SessionSignal;

use super::event::ConnectionEvent;
use super::listener::ListenerSlot;
use super::protocols::SupportedProtocols;

// ============================================================================
// ConnectionLifecycle
// ============================================================================

/// Orchestrates the single process-wide session.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    session: StreamSession,
    supported: SupportedProtocols,
    /// Attached accessories in attach order.
    attached: Vec<Accessory>,
    listener: ListenerSlot,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

// ============================================================================
// ConnectionLifecycle - Constructor
// ============================================================================

impl ConnectionLifecycle {
    /// Creates a lifecycle with no attached accessories.
    pub fn new(
        session: StreamSession,
        supported: SupportedProtocols,
        listener: ListenerSlot,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self {
        Self {
            session,
            supported,
            attached: Vec::new(),
            listener,
            events,
        }
    }
}

// ============================================================================
// ConnectionLifecycle - Queries
// ============================================================================

impl ConnectionLifecycle {
    /// Returns every attached accessory in attach order.
    #[must_use]
    pub fn list(&self) -> Vec<Accessory> {
        self.attached.clone()
    }

    /// Returns the connected accessory.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<&Accessory> {
        self.session.accessory()
    }

    /// Returns `true` while a session is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_open()
    }

    /// Returns the connected accessory, or every attached accessory when no
    /// session is open.
    #[must_use]
    pub fn discovery(&self) -> Discovery {
        match self.current() {
            Some(accessory) => Discovery::Accessory(accessory.clone()),
            None => Discovery::Attached(self.list()),
        }
    }

    /// Returns the session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &StreamSession {
        &self.session
    }
}

// ============================================================================
// ConnectionLifecycle - Connect / Disconnect
// ============================================================================

impl ConnectionLifecycle {
    /// Opens a session.
    ///
    /// [`ConnectionId::ANY`] selects the first attached accessory advertising
    /// a supported protocol; any other id must match exactly.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnecting`] if a session is already open
    /// - [`Error::NoMatchingAccessory`] if no attached accessory qualifies
    /// - [`Error::OpenFailed`] if the transport cannot bind the channels
    pub fn connect(&mut self, connection_id: ConnectionId) -> Result<Accessory> {
        if let Some(current) = self.current() {
            return Err(Error::already_connecting(current.connection_id));
        }

        let (accessory, protocol) = self
            .select(connection_id)
            .ok_or_else(|| Error::no_matching_accessory(connection_id))?;

        debug!(
            requested = %connection_id,
            connection_id = %accessory.connection_id,
            protocol = %protocol,
            "Connecting"
        );

        self.session.open(accessory.clone(), &protocol)?;
        Ok(accessory)
    }

    /// Closes the session. Always succeeds.
    pub fn disconnect(&mut self) {
        self.session.close();
    }

    /// Finds the accessory and protocol for a connect request.
    fn select(&self, connection_id: ConnectionId) -> Option<(Accessory, String)> {
        self.attached
            .iter()
            .filter(|a| connection_id.is_any() || a.connection_id == connection_id)
            .find_map(|a| {
                self.supported
                    .select(a)
                    .map(|protocol| (a.clone(), protocol.to_string()))
            })
    }
}

// ============================================================================
// ConnectionLifecycle - Data Operations
// ============================================================================

impl ConnectionLifecycle {
    /// See [`StreamSession::write`].
    ///
    /// Queued bytes are sent at once if an earlier writable event left
    /// unused capacity, including right after a write fault is re-armed.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no session is open
    /// - [`Error::WriteFailed`] once after a failed drain
    pub fn write(&mut self, bytes: Vec<u8>) -> Result<()> {
        let result = self.session.write(bytes);
        if self.session.is_open() {
            self.flush();
        }
        result
    }

    /// Spends leftover write credit, reporting a failed drain.
    fn flush(&mut self) {
        let Some(connection_id) = self.current().map(|a| a.connection_id) else {
            return;
        };

        match self.session.flush() {
            Ok(_) => {}
            Err(Error::WriteFailed { message }) => {
                self.report(ConnectionEvent::WriteFailed {
                    connection_id,
                    message,
                });
            }
            Err(e) => warn!(error = %e, "Unexpected error flushing write queue"),
        }
    }

    /// See [`StreamSession::read`].
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no session is open
    pub fn read(&mut self) -> Result<Vec<u8>> {
        self.session.read()
    }

    /// See [`StreamSession::read_until`].
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDelimiter`] if `delimiter` is empty
    /// - [`Error::NotConnected`] if no session is open
    pub fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        self.session.read_until(delimiter)
    }

    /// Empties the read buffer. A no-op when no session is open.
    pub fn clear(&mut self) {
        if self.session.clear().is_err() {
            debug!("Clear without open session ignored");
        }
    }

    /// Delivers records already in the read buffer to the subscriber.
    pub fn scan_resident(&mut self) -> usize {
        self.session.scan_resident()
    }
}

// ============================================================================
// ConnectionLifecycle - Notifications
// ============================================================================

impl ConnectionLifecycle {
    /// Applies an attach/detach notification.
    pub fn handle_accessory_event(&mut self, event: AccessoryEvent) {
        match event {
            AccessoryEvent::Attached(accessory) => self.on_attached(accessory),
            AccessoryEvent::Detached(connection_id) => self.on_detached(connection_id),
        }
    }

    /// Records an attached accessory and notifies the listener when idle.
    pub fn on_attached(&mut self, accessory: Accessory) {
        info!(
            connection_id = %accessory.connection_id,
            name = %accessory.name,
            "Accessory attached"
        );

        match self
            .attached
            .iter_mut()
            .find(|a| a.connection_id == accessory.connection_id)
        {
            Some(existing) => *existing = accessory.clone(),
            None => self.attached.push(accessory.clone()),
        }

        if self.session.is_open() {
            debug!(connection_id = %accessory.connection_id, "Session open, attach ignored");
            return;
        }

        if self.listener.notify(accessory) {
            debug!("Device discovered listener notified");
        }
    }

    /// Forgets a detached accessory; closes the session if it was bound to it.
    pub fn on_detached(&mut self, connection_id: ConnectionId) {
        info!(%connection_id, "Accessory detached");
        self.attached.retain(|a| a.connection_id != connection_id);

        let bound = self
            .current()
            .is_some_and(|current| current.connection_id == connection_id);
        if bound {
            self.session.close();
            self.report(ConnectionEvent::Lost { connection_id });
        }
    }

    /// Applies a transport event to the session and reports failures.
    pub fn handle_signal(&mut self, signal: SessionSignal) {
        let Some(connection_id) = self.current().map(|a| a.connection_id) else {
            debug!(session_id = %signal.session_id, "Event without open session dropped");
            return;
        };

        match self.session.handle_event(signal) {
            Ok(()) => {}
            Err(Error::Stream { message }) => {
                self.report(ConnectionEvent::StreamFailed {
                    connection_id,
                    message,
                });
            }
            Err(Error::WriteFailed { message }) => {
                self.report(ConnectionEvent::WriteFailed {
                    connection_id,
                    message,
                });
            }
            Err(e) => warn!(error = %e, "Unexpected error handling stream event"),
        }
    }

    fn report(&self, event: ConnectionEvent) {
        warn!(event = ?event, "Connection error");
        if self.events.send(event).is_err() {
            debug!("Connection event receiver dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::session::SubscriptionHub;
    use crate::transport::{MemoryPeer, MemoryTransport};

    const PROTOCOL: &str = "com.example.serial";

    struct Fixture {
        lifecycle: ConnectionLifecycle,
        signals: mpsc::UnboundedReceiver<SessionSignal>,
        events: mpsc::UnboundedReceiver<ConnectionEvent>,
        peer: MemoryPeer,
        listener: ListenerSlot,
        hub: SubscriptionHub,
    }

    impl Fixture {
        fn new() -> Self {
            let (transport, peer) = MemoryTransport::pair();
            let (signal_tx, signals) = mpsc::unbounded_channel();
            let (event_tx, events) = mpsc::unbounded_channel();
            let hub = SubscriptionHub::new();
            let listener = ListenerSlot::new();
            let session = StreamSession::new(Box::new(transport), signal_tx, hub.clone());
            let lifecycle = ConnectionLifecycle::new(
                session,
                SupportedProtocols::new([PROTOCOL]),
                listener.clone(),
                event_tx,
            );
            Self {
                lifecycle,
                signals,
                events,
                peer,
                listener,
                hub,
            }
        }

        fn pump(&mut self) {
            while let Ok(signal) = self.signals.try_recv() {
                self.lifecycle.handle_signal(signal);
            }
        }
    }

    fn serial_accessory(id: u64) -> Accessory {
        Accessory::new(id, format!("Device {id}")).with_protocol(PROTOCOL)
    }

    #[test]
    fn test_connect_any_picks_first_supported() {
        let mut fx = Fixture::new();
        fx.lifecycle
            .on_attached(Accessory::new(1, "Printer").with_protocol("com.other"));
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.on_attached(serial_accessory(4));

        let accessory = fx.lifecycle.connect(ConnectionId::ANY).expect("connect");
        assert_eq!(accessory.connection_id, ConnectionId::new(3));
        assert!(fx.lifecycle.is_connected());
        assert_eq!(
            fx.peer.opened(),
            vec![(ConnectionId::new(3), PROTOCOL.to_string())]
        );
    }

    #[test]
    fn test_connect_exact_id() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.on_attached(serial_accessory(4));

        let accessory = fx.lifecycle.connect(ConnectionId::new(4)).expect("connect");
        assert_eq!(accessory.connection_id, ConnectionId::new(4));
    }

    #[test]
    fn test_connect_no_match() {
        let mut fx = Fixture::new();
        assert!(matches!(
            fx.lifecycle.connect(ConnectionId::ANY),
            Err(Error::NoMatchingAccessory { .. })
        ));

        fx.lifecycle
            .on_attached(Accessory::new(5, "Printer").with_protocol("com.other"));
        assert!(matches!(
            fx.lifecycle.connect(ConnectionId::new(5)),
            Err(Error::NoMatchingAccessory { connection_id }) if connection_id == ConnectionId::new(5)
        ));
        assert!(matches!(
            fx.lifecycle.connect(ConnectionId::new(9)),
            Err(Error::NoMatchingAccessory { .. })
        ));
    }

    #[test]
    fn test_connect_while_open_keeps_session() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.on_attached(serial_accessory(4));
        fx.lifecycle.connect(ConnectionId::new(3)).expect("connect");
        let session_id = fx.lifecycle.session().session_id();

        let err = fx
            .lifecycle
            .connect(ConnectionId::new(4))
            .expect_err("already connecting");
        assert!(matches!(err, Error::AlreadyConnecting { .. }));
        assert_eq!(fx.lifecycle.session().session_id(), session_id);
        assert_eq!(
            fx.lifecycle.current().map(|a| a.connection_id),
            Some(ConnectionId::new(3))
        );
    }

    #[test]
    fn test_connect_open_failure() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.peer.fail_next_open("refused");

        let err = fx.lifecycle.connect(ConnectionId::ANY).expect_err("open fails");
        assert!(matches!(err, Error::OpenFailed { .. }));
        assert!(!fx.lifecycle.is_connected());
    }

    #[test]
    fn test_disconnect_idempotent() {
        let mut fx = Fixture::new();
        fx.lifecycle.disconnect();
        fx.lifecycle.disconnect();
        assert!(!fx.lifecycle.is_connected());

        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.connect(ConnectionId::ANY).expect("connect");
        fx.lifecycle.disconnect();
        fx.lifecycle.disconnect();
        assert!(!fx.lifecycle.is_connected());
        assert!(matches!(
            fx.lifecycle.write(b"x".to_vec()),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_attach_notifies_listener_only_when_idle() {
        let mut fx = Fixture::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        fx.listener
            .set(move |a: Accessory| sink.lock().push(a.connection_id));

        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.connect(ConnectionId::ANY).expect("connect");
        fx.lifecycle.on_attached(serial_accessory(4));

        assert_eq!(*seen.lock(), vec![ConnectionId::new(3)]);
        assert_eq!(fx.lifecycle.list().len(), 2);
    }

    #[test]
    fn test_reattach_replaces_entry() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle
            .on_attached(serial_accessory(3).with_firmware_revision("2.0"));

        let list = fx.lifecycle.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].firmware_revision, "2.0");
    }

    #[test]
    fn test_detach_of_connected_reports_lost() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.on_attached(serial_accessory(4));
        fx.lifecycle.connect(ConnectionId::new(3)).expect("connect");

        fx.lifecycle.on_detached(ConnectionId::new(4));
        assert!(fx.lifecycle.is_connected());
        assert!(fx.events.try_recv().is_err());

        fx.lifecycle.on_detached(ConnectionId::new(3));
        assert!(!fx.lifecycle.is_connected());
        assert!(!fx.peer.is_open());
        assert_eq!(
            fx.events.try_recv().expect("lost event"),
            ConnectionEvent::Lost {
                connection_id: ConnectionId::new(3)
            }
        );
        assert!(fx.lifecycle.list().is_empty());
    }

    #[test]
    fn test_stream_error_reported_once() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.connect(ConnectionId::ANY).expect("connect");

        fx.peer.fail("reset by peer");
        fx.pump();

        assert!(!fx.lifecycle.is_connected());
        assert!(matches!(
            fx.events.try_recv().expect("event"),
            ConnectionEvent::StreamFailed { ref message, .. } if message == "reset by peer"
        ));
        assert!(fx.events.try_recv().is_err());
        assert!(matches!(fx.lifecycle.read(), Err(Error::NotConnected)));
    }

    #[test]
    fn test_write_failure_reported_and_queue_kept() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.connect(ConnectionId::ANY).expect("connect");
        fx.pump();

        fx.lifecycle.write(b"AB".to_vec()).expect("write");
        fx.peer.fail_writes(Some(std::io::ErrorKind::BrokenPipe));
        fx.peer.grant(8);
        fx.pump();

        assert!(matches!(
            fx.events.try_recv().expect("event"),
            ConnectionEvent::WriteFailed { .. }
        ));
        assert!(fx.lifecycle.is_connected());
        assert_eq!(fx.lifecycle.session().pending_write_bytes(), 2);
    }

    #[test]
    fn test_write_after_early_grant() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.connect(ConnectionId::ANY).expect("connect");
        fx.peer.grant(8);
        fx.pump();

        fx.lifecycle.write(b"AB".to_vec()).expect("write");
        assert_eq!(fx.peer.written(), b"AB");
        assert_eq!(fx.lifecycle.session().pending_write_bytes(), 0);
    }

    #[test]
    fn test_rearming_write_drains_on_held_grant() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.connect(ConnectionId::ANY).expect("connect");
        fx.pump();

        fx.lifecycle.write(b"AB".to_vec()).expect("write");
        fx.peer.fail_writes(Some(std::io::ErrorKind::BrokenPipe));
        fx.peer.grant(8);
        fx.pump();
        assert!(fx.events.try_recv().is_ok());

        // Granted while the fault is latched
        fx.peer.fail_writes(None);
        fx.peer.grant(8);
        fx.pump();
        assert!(fx.peer.written().is_empty());

        assert!(matches!(
            fx.lifecycle.write(b"C".to_vec()),
            Err(Error::WriteFailed { .. })
        ));
        assert_eq!(fx.peer.written(), b"AB");
        assert_eq!(fx.lifecycle.session().pending_write_bytes(), 0);
        assert!(fx.events.try_recv().is_err());
    }

    #[test]
    fn test_scenario_without_subscription() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        let accessory = fx.lifecycle.connect(ConnectionId::new(3)).expect("connect");
        assert_eq!(accessory.connection_id, ConnectionId::new(3));

        fx.lifecycle.write(vec![0x41, 0x42]).expect("write");
        fx.peer.grant(2);
        fx.peer.send(vec![0x43, 0x0A, 0x44]);
        fx.pump();

        assert_eq!(fx.peer.written(), vec![0x41, 0x42]);
        assert_eq!(fx.lifecycle.session().pending_write_bytes(), 0);
        assert_eq!(fx.lifecycle.read().expect("read"), vec![0x43, 0x0A, 0x44]);
        assert_eq!(fx.lifecycle.session().buffered_len(), 0);
    }

    #[test]
    fn test_scenario_with_subscription() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.connect(ConnectionId::new(3)).expect("connect");

        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        fx.hub
            .subscribe(vec![0x0A], move |record| sink.lock().push(record))
            .expect("subscribe");

        fx.peer.send(vec![0x43, 0x0A, 0x44]);
        fx.pump();

        assert_eq!(*records.lock(), vec![vec![0x43, 0x0A]]);
        assert_eq!(fx.lifecycle.read().expect("read"), vec![0x44]);
    }

    #[test]
    fn test_discovery_fallback() {
        let mut fx = Fixture::new();
        fx.lifecycle.on_attached(serial_accessory(3));
        fx.lifecycle.on_attached(serial_accessory(4));
        assert!(matches!(
            fx.lifecycle.discovery(),
            Discovery::Attached(ref all) if all.len() == 2
        ));

        fx.lifecycle.connect(ConnectionId::new(4)).expect("connect");
        assert!(matches!(
            fx.lifecycle.discovery(),
            Discovery::Accessory(ref a) if a.connection_id == ConnectionId::new(4)
        ));
    }
}

//! Serial handle and reactor task.
//!
//! [`Serial`] is a cheap, cloneable handle. Every operation that touches the
//! session is sent to one reactor task that owns the
//! [`ConnectionLifecycle`]; replies come back on a oneshot channel.
//!
//! # Reactor
//!
//! ```text
//!   AccessoryEvents ──┐
//!   SessionEvents  ───┼──► reactor (ConnectionLifecycle) ──► ConnectionEvent
//!   Serial handle  ───┘        ▲ oneshot replies
//! ```
//!
//! Sources are polled in a fixed order: attach/detach notifications, then
//! transport events, then commands. Bytes that arrived before a `read` was
//! issued are therefore always visible to it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::accessory::{
    Accessory, AccessoryEvent, AccessoryEvents, AccessoryPicker, Discovery, PickOutcome,
    RadioState,
};
use crate::connection::{ConnectionEvent, ConnectionLifecycle, ListenerSlot};
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::session::{StreamSession, SubscriptionHub};
use crate::transport::{AccessoryTransport, SessionSignal};

use super::builder::SerialBuilder;
use super::config::SerialConfig;

// ============================================================================
// Command
// ============================================================================

/// Requests handled by the reactor.
enum Command {
    List(oneshot::Sender<Vec<Accessory>>),
    Discovery(oneshot::Sender<Discovery>),
    Connect {
        connection_id: ConnectionId,
        reply: oneshot::Sender<Result<Accessory>>,
    },
    Disconnect(oneshot::Sender<()>),
    Write {
        bytes: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
    Read(oneshot::Sender<Result<Vec<u8>>>),
    ReadUntil {
        delimiter: Vec<u8>,
        reply: oneshot::Sender<Result<Vec<u8>>>,
    },
    Clear(oneshot::Sender<()>),
    /// Deliver records already buffered to a fresh subscriber.
    ScanResident,
    Shutdown,
}

// ============================================================================
// Serial
// ============================================================================

/// Handle to the accessory serial link.
///
/// Clones share the same reactor. The reactor stops when the last handle is
/// dropped or [`shutdown`](Self::shutdown) is called.
#[derive(Clone)]
pub struct Serial {
    inner: Arc<SerialInner>,
}

struct SerialInner {
    command_tx: mpsc::UnboundedSender<Command>,
    accessory_events: AccessoryEvents,
    connection_events: Mutex<Option<mpsc::UnboundedReceiver<ConnectionEvent>>>,
    hub: SubscriptionHub,
    listener: ListenerSlot,
    connected: Arc<AtomicBool>,
    picker: Arc<dyn AccessoryPicker>,
    radio: Arc<dyn RadioState>,
    config: SerialConfig,
}

impl fmt::Debug for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serial")
            .field("supported_protocols", &self.inner.config.supported_protocols)
            .field("is_connected", &self.is_connected())
            .field("subscription", &self.inner.hub)
            .field("listener", &self.inner.listener)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Serial - Constructor
// ============================================================================

impl Serial {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SerialBuilder {
        SerialBuilder::new()
    }

    /// Starts the reactor. The caller has validated `config` and checked
    /// for a runtime.
    pub(crate) fn spawn(
        config: SerialConfig,
        transport: Box<dyn AccessoryTransport>,
        picker: Arc<dyn AccessoryPicker>,
        radio: Arc<dyn RadioState>,
        attached: Vec<Accessory>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (accessory_tx, accessory_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let hub = SubscriptionHub::new();
        let listener = ListenerSlot::new();
        let session = StreamSession::new(transport, signal_tx, hub.clone());
        let connected = session.connected_flag();
        let lifecycle =
            ConnectionLifecycle::new(session, config.protocols(), listener.clone(), event_tx);

        let accessory_events = AccessoryEvents::new(accessory_tx);
        for accessory in attached {
            accessory_events.attached(accessory);
        }

        info!(
            protocols = ?config.supported_protocols,
            scan_resident = config.scan_resident_on_subscribe,
            "Serial reactor starting"
        );
        tokio::spawn(run_reactor(lifecycle, command_rx, accessory_rx, signal_rx));

        Self {
            inner: Arc::new(SerialInner {
                command_tx,
                accessory_events,
                connection_events: Mutex::new(Some(event_rx)),
                hub,
                listener,
                connected,
                picker,
                radio,
                config,
            }),
        }
    }
}

// ============================================================================
// Serial - Accessors
// ============================================================================

impl Serial {
    /// Returns the sender the platform uses to report attach and detach.
    #[must_use]
    pub fn accessory_events(&self) -> AccessoryEvents {
        self.inner.accessory_events.clone()
    }

    /// Takes the receiver of asynchronous connection failures.
    ///
    /// Returns `None` after the first call.
    pub fn take_connection_events(&self) -> Option<mpsc::UnboundedReceiver<ConnectionEvent>> {
        self.inner.connection_events.lock().take()
    }

    /// Returns the declared protocol strings.
    #[inline]
    #[must_use]
    pub fn supported_protocols(&self) -> &[String] {
        &self.inner.config.supported_protocols
    }

    /// Returns `true` if the platform radio is enabled.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.radio.is_enabled()
    }

    /// Returns `true` while a session is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }
}

// ============================================================================
// Serial - Connection
// ============================================================================

impl Serial {
    /// Returns every attached accessory in attach order.
    ///
    /// Returns an empty list if the reactor has stopped.
    pub async fn list(&self) -> Vec<Accessory> {
        self.request(Command::List).await.unwrap_or_default()
    }

    /// Opens a session with an attached accessory.
    ///
    /// [`ConnectionId::ANY`] picks the first attached accessory that speaks
    /// a supported protocol.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnecting`] if a session is already open
    /// - [`Error::NoMatchingAccessory`] if no attached accessory qualifies
    /// - [`Error::OpenFailed`] if the stream channels cannot be bound
    /// - [`Error::ReactorClosed`] if the reactor has stopped
    pub async fn connect(&self, connection_id: ConnectionId) -> Result<Accessory> {
        self.request(|reply| Command::Connect {
            connection_id,
            reply,
        })
        .await?
    }

    /// Closes the session. Never fails; a no-op when nothing is open.
    pub async fn disconnect(&self) {
        if let Err(e) = self.request(Command::Disconnect).await {
            debug!(error = %e, "Disconnect after reactor stopped");
        }
    }

    /// Shows the platform picker.
    ///
    /// # Errors
    ///
    /// - [`Error::UserCancelled`] if the picker was dismissed
    /// - [`Error::SelectionFailed`] if selection failed
    pub async fn discover_unpaired(&self) -> Result<Discovery> {
        let outcome = self
            .inner
            .picker
            .pick(&self.inner.config.supported_protocols)
            .await;
        debug!(outcome = ?outcome, "Picker returned");

        match outcome {
            PickOutcome::Selected(accessory) => Ok(Discovery::Accessory(accessory)),
            PickOutcome::AlreadyConnected => self.request(Command::Discovery).await,
            PickOutcome::Cancelled => Err(Error::UserCancelled),
            PickOutcome::Failed(message) => Err(Error::selection_failed(message)),
        }
    }

    /// Installs the device discovered listener, replacing any previous one.
    ///
    /// Called for every accessory that attaches while no session is open.
    pub fn set_device_discovered_listener<F>(&self, listener: F)
    where
        F: Fn(Accessory) + Send + Sync + 'static,
    {
        self.inner.listener.set(listener);
    }

    /// Removes the device discovered listener.
    pub fn clear_device_discovered_listener(&self) {
        self.inner.listener.clear();
    }
}

// ============================================================================
// Serial - Data
// ============================================================================

impl Serial {
    /// Queues bytes for transmission.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no session is open
    /// - [`Error::WriteFailed`] once after a failed drain; `bytes` is dropped
    pub async fn write(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
        let bytes = bytes.into();
        self.request(|reply| Command::Write { bytes, reply }).await?
    }

    /// Drains every unread byte.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no session is open
    pub async fn read(&self) -> Result<Vec<u8>> {
        self.request(Command::Read).await?
    }

    /// Returns the next record ending in `delimiter`, or empty bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDelimiter`] if `delimiter` is empty
    /// - [`Error::NotConnected`] if no session is open
    pub async fn read_until(&self, delimiter: impl Into<Vec<u8>>) -> Result<Vec<u8>> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(Error::EmptyDelimiter);
        }
        self.request(|reply| Command::ReadUntil { delimiter, reply })
            .await?
    }

    /// Discards unread bytes. Never fails.
    pub async fn clear(&self) {
        if let Err(e) = self.request(Command::Clear).await {
            debug!(error = %e, "Clear after reactor stopped");
        }
    }

    /// Pushes each record ending in `delimiter` to `sink`, replacing any
    /// previous subscription.
    ///
    /// Delivered bytes are removed from the read buffer.
    ///
    /// The connected check reads a flag the reactor updates, without a round
    /// trip. A `subscribe` racing a disconnect may therefore return `Ok` for a
    /// session that has just closed. That subscription never fires: nothing
    /// feeds a closed session, and the next `connect` starts without one.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDelimiter`] if `delimiter` is empty
    /// - [`Error::NotConnected`] if no session is open
    pub fn subscribe<F>(&self, delimiter: impl Into<Vec<u8>>, sink: F) -> Result<()>
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(Error::EmptyDelimiter);
        }
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        self.inner.hub.subscribe(delimiter, sink)?;

        if self.inner.config.scan_resident_on_subscribe
            && self.inner.command_tx.send(Command::ScanResident).is_err()
        {
            debug!("Resident scan skipped, reactor stopped");
        }
        Ok(())
    }

    /// Like [`subscribe`](Self::subscribe), delivering records on a channel.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDelimiter`] if `delimiter` is empty
    /// - [`Error::NotConnected`] if no session is open
    pub fn subscribe_channel(
        &self,
        delimiter: impl Into<Vec<u8>>,
    ) -> Result<mpsc::UnboundedReceiver<Vec<u8>>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(delimiter, move |record| {
            let _ = tx.send(record);
        })?;
        Ok(rx)
    }

    /// Removes the subscription.
    pub fn unsubscribe(&self) {
        self.inner.hub.unsubscribe();
    }
}

// ============================================================================
// Serial - Lifecycle
// ============================================================================

impl Serial {
    /// Stops the reactor, closing any open session.
    pub fn shutdown(&self) {
        let _ = self.inner.command_tx.send(Command::Shutdown);
    }

    /// Sends a command and waits for its reply.
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(command(reply_tx))
            .map_err(|_| Error::ReactorClosed)?;
        Ok(reply_rx.await?)
    }
}

// ============================================================================
// Reactor
// ============================================================================

/// Owns the lifecycle until every handle is gone or shutdown is requested.
async fn run_reactor(
    mut lifecycle: ConnectionLifecycle,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    mut accessory_rx: mpsc::UnboundedReceiver<AccessoryEvent>,
    mut signal_rx: mpsc::UnboundedReceiver<SessionSignal>,
) {
    loop {
        tokio::select! {
            biased;

            Some(event) = accessory_rx.recv() => {
                lifecycle.handle_accessory_event(event);
            }

            Some(signal) = signal_rx.recv() => {
                lifecycle.handle_signal(signal);
            }

            command = command_rx.recv() => {
                match command {
                    Some(command) => {
                        if handle_command(&mut lifecycle, command).is_break() {
                            break;
                        }
                    }
                    None => {
                        debug!("Command channel closed");
                        break;
                    }
                }
            }
        }
    }

    lifecycle.disconnect();
    debug!("Serial reactor terminated");
}

/// Handles one command to completion.
fn handle_command(lifecycle: &mut ConnectionLifecycle, command: Command) -> ControlFlow<()> {
    match command {
        Command::List(reply) => {
            let _ = reply.send(lifecycle.list());
        }
        Command::Discovery(reply) => {
            let _ = reply.send(lifecycle.discovery());
        }
        Command::Connect {
            connection_id,
            reply,
        } => {
            let _ = reply.send(lifecycle.connect(connection_id));
        }
        Command::Disconnect(reply) => {
            lifecycle.disconnect();
            let _ = reply.send(());
        }
        Command::Write { bytes, reply } => {
            let _ = reply.send(lifecycle.write(bytes));
        }
        Command::Read(reply) => {
            let _ = reply.send(lifecycle.read());
        }
        Command::ReadUntil { delimiter, reply } => {
            let _ = reply.send(lifecycle.read_until(&delimiter));
        }
        Command::Clear(reply) => {
            lifecycle.clear();
            let _ = reply.send(());
        }
        Command::ScanResident => {
            let delivered = lifecycle.scan_resident();
            debug!(delivered, "Resident records scanned");
        }
        Command::Shutdown => {
            debug!("Shutdown command received");
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

// ============================================================================
// Tests
// ============================================================================

//! Classic Serial - byte-stream link to paired hardware accessories.
//!
//! This library exposes one serial-like session at a time over the stream
//! channels of an externally attached accessory: connect, write, read,
//! read up to a delimiter, or subscribe to delimited records.
//!
//! # Architecture
//!
//! The link follows a handle/reactor model:
//!
//! - **Handle ([`Serial`])**: cloneable, sends commands, awaits replies
//! - **Reactor**: one task owning the session, its read buffer and write queue
//! - **Transport ([`AccessoryTransport`])**: platform stream layer, pushes
//!   readable data and output capacity back as events
//!
//! Key design principles:
//!
//! - At most one open session per process
//! - Reads and writes never block; writes drain when the stream has space
//! - Transport events are tagged with a [`SessionId`]; stale ones are dropped
//! - Failures after `connect` are reported once as [`ConnectionEvent`]s
//!
//! # Quick Start
//!
//! ```no_run
//! use classic_serial::{Accessory, ConnectionId, MemoryTransport, Result, Serial};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (transport, peer) = MemoryTransport::pair();
//!     let serial = Serial::builder()
//!         .supported_protocol("com.example.serial")
//!         .transport(transport)
//!         .spawn()?;
//!
//!     serial
//!         .accessory_events()
//!         .attached(Accessory::new(3, "Scanner").with_protocol("com.example.serial"));
//!
//!     let accessory = serial.connect(ConnectionId::ANY).await?;
//!     println!("Connected to {}", accessory.name);
//!
//!     serial.write(b"PING\n".to_vec()).await?;
//!     peer.grant(64);
//!
//!     peer.send(b"PONG\n".to_vec());
//!     let line = serial.read_until(b"\n".to_vec()).await?;
//!     println!("Received {line:?}");
//!
//!     serial.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`accessory`] | Accessory snapshot, picker and radio boundaries |
//! | [`buffer`] | Read buffer and write queue |
//! | [`connection`] | Attach/detach handling and connection events |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`serial`] | [`Serial`] handle, builder and configuration |
//! | [`session`] | Stream session and subscriptions |
//! | [`transport`] | Platform stream boundary and in-memory transport |

// ============================================================================
// Modules
// ============================================================================

/// Accessory snapshot, picker and radio boundaries.
pub mod accessory;

/// Read buffer and write queue.
pub mod buffer;

/// Attach/detach handling and connection events.
pub mod connection;

/// Error types and result alias.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifier wrappers.
pub mod identifiers;

/// Public serial link handle.
///
/// Use [`Serial::builder()`] to configure and start a link.
pub mod serial;

/// Stream session and subscriptions.
pub mod session;

/// Platform stream boundary.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Accessory types
pub use accessory::{
    Accessory, AccessoryEvent, AccessoryEvents, AccessoryPicker, Discovery, NoPicker,
    PickOutcome, RadioFlag, RadioState,
};

// Buffer types
pub use buffer::{ByteBuffer, WriteQueue};

// Connection types
pub use connection::{ConnectionEvent, DeviceDiscoveredListener};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, SessionId};

// Serial types
pub use serial::{Serial, SerialBuilder, SerialConfig};

// Session types
pub use session::{RecordSink, SessionState};

// Transport types
pub use transport::{
    AccessoryTransport, MemoryPeer, MemoryTransport, SessionChannels, SessionEvents, StreamEvent,
};

//! Connection lifecycle.
//!
//! Tracks which accessories are attached, enforces the single-session rule
//! and reports failures of an established session.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | [`ConnectionEvent`] reported after `connect` returned |
//! | `lifecycle` | [`ConnectionLifecycle`] orchestration |
//! | `listener` | Device discovered listener slot |
//! | `protocols` | Application's supported protocol strings |

// ============================================================================
// Submodules
// ============================================================================

/// Asynchronous connection failures.
pub mod event;

/// Attach/detach handling and session orchestration.
pub mod lifecycle;

/// Device discovered listener slot.
pub mod listener;

/// Supported protocol strings.
pub mod protocols;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::ConnectionEvent;
pub use lifecycle::ConnectionLifecycle;
pub use listener::{DeviceDiscoveredListener, ListenerSlot};
pub use protocols::SupportedProtocols;

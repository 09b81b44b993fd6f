//! Stream session and delimiter subscriptions.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StreamSession`] | Open/close state machine owning the read buffer and write queue |
//! | [`SessionState`] | `Closed → Opening → Open → Closing → Closed` |
//! | [`SubscriptionHub`] | Pushes delimited records to a single subscriber |

// ============================================================================
// Submodules
// ============================================================================

/// Session lifecycle states.
pub mod state;

/// Stream session state machine.
pub mod stream;

/// Delimiter-based push notification.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use state::SessionState;
pub use stream::StreamSession;
pub use subscription::{RecordSink, SubscriptionHub};

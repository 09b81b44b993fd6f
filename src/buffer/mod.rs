//! Inbound and outbound byte buffers.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `read` | [`ByteBuffer`]: append, delimiter search, prefix consume |
//! | `write` | [`WriteQueue`]: ordered outbound chunks drained on writable |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound byte buffer with delimiter framing.
pub mod read;

/// Outbound chunk queue.
pub mod write;

// ============================================================================
// Re-exports
// ============================================================================

pub use read::ByteBuffer;
pub use write::WriteQueue;

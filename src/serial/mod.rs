//! Public serial link handle.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`SerialBuilder`] fluent configuration |
//! | `config` | [`SerialConfig`] declared protocols and flags |
//! | `core` | [`Serial`] handle and reactor task |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for serial link configuration.
pub mod builder;

/// Serial link configuration.
pub mod config;

/// Serial handle and reactor task.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SerialBuilder;
pub use config::SerialConfig;
pub use self::core::Serial;

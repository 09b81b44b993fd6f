//! Radio enablement boundary.
//!
//! Whether the radio is switched on is owned by the platform, not by the
//! session. It is tracked separately from connection state.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// RadioState
// ============================================================================

/// Reports whether the platform radio is enabled.
pub trait RadioState: Send + Sync {
    /// Returns `true` if the radio is powered on.
    fn is_enabled(&self) -> bool;
}

// ============================================================================
// RadioFlag
// ============================================================================

/// Shared radio flag updated by a platform state callback.
#[derive(Debug, Clone)]
pub struct RadioFlag {
    enabled: Arc<AtomicBool>,
}

impl RadioFlag {
    /// Creates a flag with an initial value.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    /// Records a radio state change.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl Default for RadioFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RadioState for RadioFlag {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

// ============================================================================
// Tests
// ============================================================================

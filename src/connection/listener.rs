//! Device discovered listener slot.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::accessory::Accessory;

// ============================================================================
// Types
// ============================================================================

/// Called with the snapshot of an accessory that attached while no session
/// was open.
pub type DeviceDiscoveredListener = Arc<dyn Fn(Accessory) + Send + Sync>;

// ============================================================================
// ListenerSlot
// ============================================================================

/// Process-wide single-slot listener registration.
///
/// Clones share the slot. Setting replaces; it never appends.
#[derive(Clone, Default)]
pub struct ListenerSlot {
    slot: Arc<Mutex<Option<DeviceDiscoveredListener>>>,
}

impl fmt::Debug for ListenerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSlot")
            .field("is_set", &self.is_set())
            .finish()
    }
}

impl ListenerSlot {
    /// Creates an empty slot.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `listener`, replacing any previous one.
    pub fn set<F>(&self, listener: F)
    where
        F: Fn(Accessory) + Send + Sync + 'static,
    {
        *self.slot.lock() = Some(Arc::new(listener));
    }

    /// Removes the listener.
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// Returns `true` if a listener is installed.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Invokes the listener, if any, outside the slot lock.
    ///
    /// Returns `true` if a listener was called.
    pub fn notify(&self, accessory: Accessory) -> bool {
        let listener = self.slot.lock().clone();
        match listener {
            Some(listener) => {
                listener(accessory);
                true
            }
            None => false,
        }
    }
}

//! Type-safe identifiers for accessories and sessions.
//!
//! Newtype wrappers prevent mixing a platform connection id with the
//! locally generated session id.
//!
//! | Type | Backing | Source |
//! |------|---------|--------|
//! | [`ConnectionId`] | `u64` | Assigned by the accessory manager |
//! | [`SessionId`] | UUID v4 | Generated each time a session opens |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ConnectionId
// ============================================================================

/// Platform identifier of an attached accessory.
///
/// The value `0` is reserved as [`ConnectionId::ANY`], which asks `connect`
/// to pick the first attached accessory speaking a supported protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Sentinel selecting any accessory with a supported protocol.
    pub const ANY: Self = Self(0);

    /// Wraps a raw connection id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` for the [`ConnectionId::ANY`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_any(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for ConnectionId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Identifier of one opened session.
///
/// Transport events carry the id of the session that produced them, so
/// events that arrive after the session closed can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_any() {
        assert!(ConnectionId::ANY.is_any());
        assert!(ConnectionId::new(0).is_any());
        assert!(!ConnectionId::new(3).is_any());
    }

    #[test]
    fn test_connection_id_serde_transparent() {
        let json = serde_json::to_string(&ConnectionId::new(42)).expect("serialize");
        assert_eq!(json, "42");

        let id: ConnectionId = serde_json::from_str("9").expect("deserialize");
        assert_eq!(id, ConnectionId::from(9));
    }

    #[test]
    fn test_session_id_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }
}

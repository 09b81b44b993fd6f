//! Session lifecycle states.

use std::fmt;

/// State of the [`StreamSession`](super::StreamSession).
///
/// ```text
/// Closed ──open──► Opening ──bound──► Open ──close/error──► Closing ──► Closed
///                     └──────bind failed──────────────────────────────►┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No session.
    #[default]
    Closed,
    /// Channels are being bound.
    Opening,
    /// Reads and writes are allowed.
    Open,
    /// Channels are being torn down.
    Closing,
}

impl SessionState {
    /// Returns `true` only in [`SessionState::Open`].
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

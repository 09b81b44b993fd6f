//! Outbound chunk queue.
//!
//! Callers enqueue whole chunks; the session drains them into the output
//! channel whenever the transport reports free capacity. A chunk that only
//! partly fits stays at the front holding its unsent suffix.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Write};

use tracing::trace;

// ============================================================================
// WriteQueue
// ============================================================================

/// Ordered queue of pending outbound byte chunks.
#[derive(Debug, Clone, Default)]
pub struct WriteQueue {
    chunks: VecDeque<Vec<u8>>,
    pending_bytes: usize,
}

impl WriteQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk at the back. Empty chunks are ignored.
    pub fn enqueue(&mut self, bytes: Vec<u8>) {
        if bytes.is_empty() {
            return;
        }
        self.pending_bytes += bytes.len();
        self.chunks.push_back(bytes);
    }

    /// Pushes up to `max_bytes` from the front of the queue into `writer`.
    ///
    /// Fully written chunks are removed; a partially written chunk keeps
    /// its unsent suffix at the front. The drain stops early when the
    /// writer accepts zero bytes or reports [`ErrorKind::WouldBlock`].
    ///
    /// # Errors
    ///
    /// Returns the writer's error for any other failure. Bytes the writer
    /// did not accept are left in the queue.
    pub fn drain<W>(&mut self, writer: &mut W, max_bytes: usize) -> io::Result<usize>
    where
        W: Write + ?Sized,
    {
        let mut written = 0;

        while written < max_bytes {
            let Some(front) = self.chunks.front_mut() else {
                break;
            };

            let budget = (max_bytes - written).min(front.len());
            let accepted = match writer.write(&front[..budget]) {
                Ok(0) => break,
                Ok(n) => n.min(budget),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            };

            if accepted == front.len() {
                self.chunks.pop_front();
            } else {
                front.drain(..accepted);
            }

            self.pending_bytes -= accepted;
            written += accepted;
        }

        trace!(written, pending = self.pending_bytes, "Drained write queue");
        Ok(written)
    }

    /// Returns the number of queued chunks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the total number of unsent bytes.
    #[inline]
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }
}

// ============================================================================
// Tests
// ============================================================================

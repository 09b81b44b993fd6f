//! Inbound byte buffer with delimiter framing.
//!
//! [`ByteBuffer`] is the only place delimiter matching is implemented.
//! Direct `read_until` calls and subscription delivery both go through
//! [`ByteBuffer::read_until`], so they always agree on record boundaries.
//!
//! # Framing
//!
//! A record is the shortest prefix that ends with the first occurrence of
//! the delimiter. With delimiter `\r\n`:
//!
//! ```text
//! buffer:  a b \r \n c \r \n d
//!                   ^ find_delimiter = 4
//! consume_prefix(4) -> "ab\r\n", remaining "c\r\nd"
//! ```
//!
//! # Incremental Search
//!
//! A `read_until` that finds nothing remembers where the next search for the
//! same delimiter may resume: `len - (delimiter_len - 1)`, the first index at
//! which a match could still complete. Appending keeps that position;
//! anything that removes bytes resets it. Waiting for a record that arrives
//! in many small chunks is therefore linear in the bytes received.

// ============================================================================
// ByteBuffer
// ============================================================================

/// Append-only growable byte buffer.
///
/// Shrinks only through [`consume_prefix`](Self::consume_prefix),
/// [`take_all`](Self::take_all) or [`clear`](Self::clear). All operations
/// are total: none of them fail on an empty buffer.
#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
    /// Delimiter of the last unsuccessful `read_until` and the index from
    /// which its next search resumes.
    resume: Option<(Vec<u8>, usize)>,
}

impl ByteBuffer {
    /// Creates an empty buffer.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            resume: None,
        }
    }

    /// Appends bytes at the end.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Finds the first occurrence of `delimiter`.
    ///
    /// Returns the index one past the end of the match, i.e. the length of
    /// the record including the delimiter. An empty delimiter never matches.
    #[must_use]
    pub fn find_delimiter(&self, delimiter: &[u8]) -> Option<usize> {
        self.find_delimiter_from(delimiter, 0)
    }

    /// Like [`find_delimiter`](Self::find_delimiter), ignoring matches that
    /// start before `from`.
    #[must_use]
    pub fn find_delimiter_from(&self, delimiter: &[u8], from: usize) -> Option<usize> {
        let (&first, rest) = delimiter.split_first()?;
        let last_start = self.data.len().checked_sub(delimiter.len())?;
        if from > last_start {
            return None;
        }

        self.data[from..=last_start]
            .iter()
            .enumerate()
            .filter(|&(_, &byte)| byte == first)
            .map(|(offset, _)| from + offset)
            .find(|&start| &self.data[start + 1..start + delimiter.len()] == rest)
            .map(|start| start + delimiter.len())
    }

    /// Removes and returns the first `upto` bytes.
    ///
    /// `upto` is clamped to the buffer length.
    pub fn consume_prefix(&mut self, upto: usize) -> Vec<u8> {
        self.resume = None;
        let upto = upto.min(self.data.len());
        let remainder = self.data.split_off(upto);
        std::mem::replace(&mut self.data, remainder)
    }

    /// Removes and returns the record terminated by `delimiter`.
    ///
    /// Returns `None` and leaves the bytes untouched when no complete
    /// record is present. Repeated calls with the same delimiter only scan
    /// bytes appended since the previous call.
    pub fn read_until(&mut self, delimiter: &[u8]) -> Option<Vec<u8>> {
        if delimiter.is_empty() {
            return None;
        }

        let from = match &self.resume {
            Some((last, from)) if last.as_slice() == delimiter => *from,
            _ => 0,
        };

        if let Some(end) = self.find_delimiter_from(delimiter, from) {
            return Some(self.consume_prefix(end));
        }

        let next = self.data.len().saturating_sub(delimiter.len() - 1);
        match &mut self.resume {
            Some((last, from)) if last.as_slice() == delimiter => *from = next,
            resume => *resume = Some((delimiter.to_vec(), next)),
        }
        None
    }

    /// Drains the entire buffer.
    #[inline]
    pub fn take_all(&mut self) -> Vec<u8> {
        self.resume = None;
        std::mem::take(&mut self.data)
    }

    /// Discards all buffered bytes.
    #[inline]
    pub fn clear(&mut self) {
        self.resume = None;
        self.data.clear();
    }

    /// Returns the number of buffered bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the buffered bytes without consuming them.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Delimiter-based push notification.
//!
//! After every ingest the session asks the hub to react. While a
//! subscription is active and the read buffer holds its delimiter, the hub
//! consumes one record and hands it to the sink, then looks again, so a
//! single ingest can deliver several records in order. Without a
//! subscription the bytes stay in the buffer for direct reads.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::buffer::ByteBuffer;
use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Receives each delimited record, delimiter included.
pub type RecordSink = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// The single active subscription.
#[derive(Clone)]
struct Subscription {
    delimiter: Arc<[u8]>,
    sink: RecordSink,
}

// ============================================================================
// SubscriptionHub
// ============================================================================

/// Single-slot subscription registry.
///
/// Cloning shares the slot, so callers can replace the subscription
/// immediately while the reactor delivers records.
#[derive(Clone, Default)]
pub struct SubscriptionHub {
    slot: Arc<Mutex<Option<Subscription>>>,
}

impl fmt::Debug for SubscriptionHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHub")
            .field("delimiter", &self.delimiter())
            .finish_non_exhaustive()
    }
}

impl SubscriptionHub {
    /// Creates an empty hub.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a subscription, replacing any existing one.
    ///
    /// Only bytes ingested afterwards trigger delivery.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDelimiter`] if `delimiter` is empty
    pub fn subscribe<F>(&self, delimiter: impl Into<Vec<u8>>, sink: F) -> Result<()>
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        let delimiter: Vec<u8> = delimiter.into();
        if delimiter.is_empty() {
            return Err(Error::EmptyDelimiter);
        }

        debug!(delimiter = ?delimiter, "Subscription installed");
        *self.slot.lock() = Some(Subscription {
            delimiter: delimiter.into(),
            sink: Arc::new(sink),
        });
        Ok(())
    }

    /// Removes the active subscription, if any.
    pub fn unsubscribe(&self) {
        if self.slot.lock().take().is_some() {
            debug!("Subscription removed");
        }
    }

    /// Returns `true` while a subscription is installed.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Returns the active delimiter.
    #[must_use]
    pub fn delimiter(&self) -> Option<Vec<u8>> {
        self.slot.lock().as_ref().map(|sub| sub.delimiter.to_vec())
    }

    /// Delivers every complete record in `buffer` to the subscriber.
    ///
    /// The slot is re-read before each record and the sink runs without the
    /// slot locked, so a sink may unsubscribe or resubscribe. Returns the
    /// number of records delivered.
    pub fn react(&self, buffer: &mut ByteBuffer) -> usize {
        let mut delivered = 0;

        loop {
            let Some(subscription) = self.slot.lock().clone() else {
                break;
            };
            let Some(record) = buffer.read_until(&subscription.delimiter) else {
                break;
            };

            trace!(len = record.len(), "Delivering record to subscriber");
            (subscription.sink)(record);
            delivered += 1;
        }

        delivered
    }
}

// ============================================================================
// Tests
// ============================================================================

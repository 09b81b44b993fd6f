//! Builder pattern for serial link configuration.
//!
//! # Example
//!
//! ```no_run
//! use classic_serial::{MemoryTransport, Serial};
//!
//! # async fn example() -> classic_serial::Result<()> {
//! let (transport, _peer) = MemoryTransport::pair();
//! let serial = Serial::builder()
//!     .supported_protocol("com.example.serial")
//!     .transport(transport)
//!     .spawn()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::accessory::{Accessory, AccessoryPicker, NoPicker, RadioFlag, RadioState};
use crate::error::{Error, Result};
use crate::transport::AccessoryTransport;

use super::config::SerialConfig;
use super::core::Serial;

// ============================================================================
// SerialBuilder
// ============================================================================

/// Builder for a [`Serial`] handle.
///
/// Use [`Serial::builder()`] to create one.
#[derive(Default)]
pub struct SerialBuilder {
    config: SerialConfig,
    transport: Option<Box<dyn AccessoryTransport>>,
    picker: Option<Arc<dyn AccessoryPicker>>,
    radio: Option<Arc<dyn RadioState>>,
    /// Accessories already attached at startup, in attach order.
    attached: Vec<Accessory>,
}

impl fmt::Debug for SerialBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialBuilder")
            .field("config", &self.config)
            .field("has_transport", &self.transport.is_some())
            .field("has_picker", &self.picker.is_some())
            .field("has_radio", &self.radio.is_some())
            .field("attached", &self.attached.len())
            .finish()
    }
}

// ============================================================================
// SerialBuilder Implementation
// ============================================================================

impl SerialBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: SerialConfig) -> Self {
        self.config = config;
        self
    }

    /// Declares a supported protocol string.
    #[inline]
    #[must_use]
    pub fn supported_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.config.supported_protocols.push(protocol.into());
        self
    }

    /// Delivers already-buffered records when a subscription is installed.
    #[inline]
    #[must_use]
    pub fn scan_resident_on_subscribe(mut self, enabled: bool) -> Self {
        self.config.scan_resident_on_subscribe = enabled;
        self
    }

    /// Sets the platform stream layer.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl AccessoryTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Sets the accessory picker used by `discover_unpaired`.
    ///
    /// Without one, `discover_unpaired` fails with a selection error.
    #[inline]
    #[must_use]
    pub fn picker(mut self, picker: impl AccessoryPicker + 'static) -> Self {
        self.picker = Some(Arc::new(picker));
        self
    }

    /// Sets the radio state source. Defaults to an always-enabled flag.
    #[inline]
    #[must_use]
    pub fn radio(mut self, radio: impl RadioState + 'static) -> Self {
        self.radio = Some(Arc::new(radio));
        self
    }

    /// Seeds an accessory that is attached before the reactor starts.
    #[inline]
    #[must_use]
    pub fn attached(mut self, accessory: Accessory) -> Self {
        self.attached.push(accessory);
        self
    }

    /// Validates the configuration and starts the reactor.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no protocol is declared or one is blank
    /// - [`Error::Config`] if no transport is set
    /// - [`Error::Config`] if called outside a tokio runtime
    pub fn spawn(self) -> Result<Serial> {
        self.config.validate()?;

        let transport = self.transport.ok_or_else(|| {
            Error::config(
                "Transport is required. Use .transport() to set it.\n\
                 Example: Serial::builder().transport(MemoryTransport::pair().0)",
            )
        })?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::config(
                "Serial::builder().spawn() must be called within a tokio runtime",
            ));
        }

        let picker = self.picker.unwrap_or_else(|| Arc::new(NoPicker));
        let radio = self
            .radio
            .unwrap_or_else(|| Arc::new(RadioFlag::default()));

        Ok(Serial::spawn(
            self.config,
            transport,
            picker,
            radio,
            self.attached,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

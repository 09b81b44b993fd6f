//! Serial link configuration.
//!
//! The application declares which protocol strings it speaks. Accessories
//! advertising none of them are never selected by `connect`.
//!
//! # Example
//!
//! ```
//! use classic_serial::SerialConfig;
//!
//! let config = SerialConfig::from_json(
//!     r#"{ "supportedProtocols": ["com.example.serial"] }"#,
//! )?;
//! assert!(!config.scan_resident_on_subscribe);
//! # Ok::<(), classic_serial::Error>(())
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::connection::SupportedProtocols;
use crate::error::{Error, Result};

// ============================================================================
// SerialConfig
// ============================================================================

/// Declared protocols and subscription behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerialConfig {
    /// Protocol strings the application speaks, in preference order.
    pub supported_protocols: Vec<String>,

    /// Deliver records already sitting in the read buffer when a
    /// subscription is installed.
    ///
    /// Off by default: only bytes arriving after `subscribe` are scanned.
    pub scan_resident_on_subscribe: bool,
}

impl SerialConfig {
    /// Creates a configuration declaring `protocols`.
    #[must_use]
    pub fn new<I, S>(protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported_protocols: protocols.into_iter().map(Into::into).collect(),
            scan_resident_on_subscribe: false,
        }
    }

    /// Parses a configuration from JSON and validates it.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if `json` is malformed
    /// - [`Error::Config`] if the configuration is invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that at least one protocol is declared and none is blank.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.supported_protocols.is_empty() {
            return Err(Error::config(
                "At least one supported protocol is required. \
                 Use .supported_protocol() to declare it.\n\
                 Example: Serial::builder().supported_protocol(\"com.example.serial\")",
            ));
        }

        if let Some(index) = self
            .supported_protocols
            .iter()
            .position(|p| p.trim().is_empty())
        {
            return Err(Error::config(format!(
                "Supported protocol at index {index} is blank"
            )));
        }

        Ok(())
    }

    /// Returns the declared protocols as a lookup set.
    #[must_use]
    pub fn protocols(&self) -> SupportedProtocols {
        SupportedProtocols::new(self.supported_protocols.iter().cloned())
    }
}

// ============================================================================
// Tests
// ============================================================================

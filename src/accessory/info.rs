//! Accessory snapshot and attach/detach notifications.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::identifiers::ConnectionId;

// ============================================================================
// Accessory
// ============================================================================

/// Immutable snapshot of an attached accessory.
///
/// Taken when the accessory manager reports the attach and handed out by
/// `list`, `connect` and the device discovered listener.
///
/// # Format
///
/// ```json
/// {
///   "connectionId": 3,
///   "name": "Scanner",
///   "protocolStrings": ["com.example.serial"],
///   "serialNumber": "SN-001",
///   "manufacturer": "Example",
///   "modelNumber": "X1",
///   "firmwareRevision": "1.0.2",
///   "hardwareRevision": "B"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    /// Platform connection id.
    pub connection_id: ConnectionId,

    /// Display name.
    pub name: String,

    /// Protocol strings advertised by the accessory, in its preferred order.
    #[serde(default)]
    pub protocol_strings: Vec<String>,

    /// Serial number.
    #[serde(default)]
    pub serial_number: String,

    /// Manufacturer name.
    #[serde(default)]
    pub manufacturer: String,

    /// Model number.
    #[serde(default)]
    pub model_number: String,

    /// Firmware revision.
    #[serde(default)]
    pub firmware_revision: String,

    /// Hardware revision.
    #[serde(default)]
    pub hardware_revision: String,
}

impl Accessory {
    /// Creates a snapshot with an id and name; other fields empty.
    #[must_use]
    pub fn new(connection_id: impl Into<ConnectionId>, name: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            name: name.into(),
            protocol_strings: Vec::new(),
            serial_number: String::new(),
            manufacturer: String::new(),
            model_number: String::new(),
            firmware_revision: String::new(),
            hardware_revision: String::new(),
        }
    }

    /// Appends an advertised protocol string.
    #[inline]
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol_strings.push(protocol.into());
        self
    }

    /// Sets the serial number.
    #[inline]
    #[must_use]
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = serial_number.into();
        self
    }

    /// Sets the manufacturer.
    #[inline]
    #[must_use]
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    /// Sets the model number.
    #[inline]
    #[must_use]
    pub fn with_model_number(mut self, model_number: impl Into<String>) -> Self {
        self.model_number = model_number.into();
        self
    }

    /// Sets the firmware revision.
    #[inline]
    #[must_use]
    pub fn with_firmware_revision(mut self, firmware_revision: impl Into<String>) -> Self {
        self.firmware_revision = firmware_revision.into();
        self
    }

    /// Sets the hardware revision.
    #[inline]
    #[must_use]
    pub fn with_hardware_revision(mut self, hardware_revision: impl Into<String>) -> Self {
        self.hardware_revision = hardware_revision.into();
        self
    }

    /// Returns `true` if the accessory advertises `protocol`.
    #[inline]
    #[must_use]
    pub fn supports(&self, protocol: &str) -> bool {
        self.protocol_strings.iter().any(|p| p == protocol)
    }

    /// Returns the snapshot as a JSON details object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ============================================================================
// AccessoryEvent
// ============================================================================

/// Notification from the platform accessory manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessoryEvent {
    /// An accessory became available to the application.
    Attached(Accessory),
    /// An accessory went away.
    Detached(ConnectionId),
}

// ============================================================================
// AccessoryEvents
// ============================================================================

/// Sender half handed to the platform accessory manager.
///
/// Cloneable; every clone feeds the same reactor.
#[derive(Debug, Clone)]
pub struct AccessoryEvents {
    tx: mpsc::UnboundedSender<AccessoryEvent>,
}

impl AccessoryEvents {
    pub(crate) fn new(tx: mpsc::UnboundedSender<AccessoryEvent>) -> Self {
        Self { tx }
    }

    /// Reports an attached accessory.
    ///
    /// Returns `false` if the reactor has stopped.
    pub fn attached(&self, accessory: Accessory) -> bool {
        self.tx.send(AccessoryEvent::Attached(accessory)).is_ok()
    }

    /// Reports a detached accessory.
    ///
    /// Returns `false` if the reactor has stopped.
    pub fn detached(&self, connection_id: ConnectionId) -> bool {
        self.tx.send(AccessoryEvent::Detached(connection_id)).is_ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> Accessory {
        Accessory::new(3, "Scanner")
            .with_protocol("com.example.serial")
            .with_protocol("com.example.firmware")
            .with_serial_number("SN-001")
            .with_manufacturer("Example")
            .with_model_number("X1")
            .with_firmware_revision("1.0.2")
            .with_hardware_revision("B")
    }

    #[test]
    fn test_supports() {
        let accessory = scanner();
        assert!(accessory.supports("com.example.serial"));
        assert!(!accessory.supports("com.other"));
    }

    #[test]
    fn test_to_json_uses_camel_case() {
        let json = scanner().to_json();
        assert_eq!(json["connectionId"], 3);
        assert_eq!(json["protocolStrings"][1], "com.example.firmware");
        assert_eq!(json["firmwareRevision"], "1.0.2");
        assert_eq!(json["hardwareRevision"], "B");
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let json_str = r#"{ "connectionId": 5, "name": "Printer" }"#;
        let accessory: Accessory = serde_json::from_str(json_str).expect("parse accessory");
        assert_eq!(accessory.connection_id, ConnectionId::new(5));
        assert!(accessory.protocol_strings.is_empty());
        assert!(accessory.serial_number.is_empty());
    }

    #[test]
    fn test_events_report_closed_reactor() {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = AccessoryEvents::new(tx);
        assert!(events.attached(scanner()));
        drop(rx);
        assert!(!events.detached(ConnectionId::new(3)));
    }
}

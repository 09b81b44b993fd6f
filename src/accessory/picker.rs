//! Accessory selection UI boundary.
//!
//! Showing a device picker is platform UI and lives outside this crate.
//! The [`AccessoryPicker`] trait is what `discover_unpaired` awaits.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::Serialize;

use super::info::Accessory;

// ============================================================================
// PickOutcome
// ============================================================================

/// What the user did with the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// A new accessory was selected and attached.
    Selected(Accessory),
    /// The user picked an accessory that is already connected.
    ///
    /// The platform does not say which one.
    AlreadyConnected,
    /// The user dismissed the picker.
    Cancelled,
    /// Selection failed for another reason.
    Failed(String),
}

// ============================================================================
// Discovery
// ============================================================================

/// Successful result of `discover_unpaired`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Discovery {
    /// A single accessory: the new selection, or the connected one.
    Accessory(Accessory),
    /// Every attached accessory, when the picked device is already
    /// connected but no session is open.
    Attached(Vec<Accessory>),
}

// ============================================================================
// AccessoryPicker
// ============================================================================

/// Presents the platform accessory picker.
///
/// `supported` lists the protocol strings the application declared, so the
/// picker can filter devices the same way the platform does.
#[async_trait]
pub trait AccessoryPicker: Send + Sync {
    /// Shows the picker and waits for the user.
    async fn pick(&self, supported: &[String]) -> PickOutcome;
}

/// Picker used when the application did not install one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPicker;

#[async_trait]
impl AccessoryPicker for NoPicker {
    async fn pick(&self, _supported: &[String]) -> PickOutcome {
        PickOutcome::Failed("no accessory picker configured".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

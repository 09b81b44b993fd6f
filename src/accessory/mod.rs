//! Accessory identity and the collaborators around it.
//!
//! The crate does not discover or pair accessories itself. The platform
//! accessory manager reports attach/detach through [`AccessoryEvents`], an
//! optional [`AccessoryPicker`] shows the selection UI, and [`RadioState`]
//! answers whether the radio is switched on.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `info` | [`Accessory`] snapshot and attach/detach notifications |
//! | `picker` | Accessory selection UI boundary |
//! | `radio` | Radio enablement boundary |

// ============================================================================
// Submodules
// ============================================================================

/// Accessory snapshot and attach/detach notifications.
pub mod info;

/// Accessory selection UI boundary.
pub mod picker;

/// Radio enablement boundary.
pub mod radio;

// ============================================================================
// Re-exports
// ============================================================================

pub use info::{Accessory, AccessoryEvent, AccessoryEvents};
pub use picker::{AccessoryPicker, Discovery, NoPicker, PickOutcome};
pub use radio::{RadioFlag, RadioState};

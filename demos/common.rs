//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - A ready-made in-memory accessory

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use classic_serial::Accessory;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Protocol string every demo declares.
pub const PROTOCOL: &str = "com.example.serial";

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "classic_serial=debug"
    } else {
        "classic_serial=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// A barcode scanner speaking [`PROTOCOL`].
pub fn scanner(id: u64) -> Accessory {
    Accessory::new(id, "Barcode Scanner")
        .with_protocol(PROTOCOL)
        .with_manufacturer("Example Corp")
        .with_model_number("BS-200")
        .with_serial_number(format!("SN-{id:04}"))
        .with_firmware_revision("1.4.2")
        .with_hardware_revision("B")
}

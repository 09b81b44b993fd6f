//! Delimited record subscription and device discovery.
//!
//! Demonstrates:
//! - Loading configuration from JSON
//! - Device discovered listener while idle
//! - Subscribing to newline-terminated records
//! - Resident records delivered on subscribe
//!
//! Usage:
//!   cargo run --example subscribe
//!   cargo run --example subscribe -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use classic_serial::{ConnectionId, MemoryTransport, Serial, SerialConfig};
use common::Args;
use tokio::time::timeout;

// ============================================================================
// Constants
// ============================================================================

const CONFIG: &str = r#"{
    "supportedProtocols": ["com.example.serial"],
    "scanResidentOnSubscribe": true
}"#;

const RECORD_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    println!("=== Subscribe ===\n");

    // ========================================================================
    // Spawn Link
    // ========================================================================

    println!("[1] Loading configuration...");

    let config = SerialConfig::from_json(CONFIG)?;
    let (transport, peer) = MemoryTransport::pair();
    let serial = Serial::builder()
        .config(config)
        .transport(transport)
        .spawn()?;

    serial.set_device_discovered_listener(|accessory| {
        println!("    ✓ Discovered: {} ({})", accessory.name, accessory.connection_id);
    });

    println!("    ✓ Protocols: {:?}\n", serial.supported_protocols());

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[2] Attaching...");

    serial.accessory_events().attached(common::scanner(7));
    let accessory = serial.connect(ConnectionId::new(7)).await?;
    serial.clear_device_discovered_listener();

    println!("    ✓ Connected: {}\n", accessory.name);

    // ========================================================================
    // Subscribe
    // ========================================================================

    println!("[3] Subscribing...");

    // Arrives before the subscription; delivered by the resident scan
    peer.send(b"0123456789\n".to_vec());
    let _ = serial.list().await;

    let mut records = serial.subscribe_channel(b"\n".to_vec())?;
    peer.send(b"4006381333931\n9780201379624\npartial".to_vec());

    for _ in 0..3 {
        match timeout(RECORD_TIMEOUT, records.recv()).await {
            Ok(Some(record)) => {
                println!("    ✓ Record: {}", String::from_utf8_lossy(&record).trim_end());
            }
            Ok(None) | Err(_) => break,
        }
    }

    serial.unsubscribe();
    let rest = serial.read().await?;
    println!("    ✓ Unread: {:?}\n", String::from_utf8_lossy(&rest));

    serial.disconnect().await;
    println!("=== Done ===");
    Ok(())
}

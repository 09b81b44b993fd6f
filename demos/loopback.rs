//! Write and read over an in-memory accessory.
//!
//! Demonstrates:
//! - Building a link around the in-memory transport
//! - Connecting to the first accessory with a supported protocol
//! - Queued writes draining when the peer grants space
//! - Plain and delimited reads
//! - Connection events after the accessory detaches
//!
//! Usage:
//!   cargo run --example loopback
//!   cargo run --example loopback -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use classic_serial::{ConnectionId, MemoryTransport, Serial};
use common::{Args, PROTOCOL};

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
    println!("=== Loopback ===\n");

    // ========================================================================
    // Spawn Link
    // ========================================================================

    println!("[1] Spawning link...");

    let (transport, peer) = MemoryTransport::pair();
    let serial = Serial::builder()
        .supported_protocol(PROTOCOL)
        .transport(transport)
        .spawn()?;
    let mut events = serial
        .take_connection_events()
        .ok_or_else(|| anyhow::anyhow!("connection events already taken"))?;

    println!("    ✓ Radio enabled: {}\n", serial.is_enabled());

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[2] Attaching and connecting...");

    serial.accessory_events().attached(common::scanner(3));
    let accessory = serial.connect(ConnectionId::ANY).await?;

    println!("    ✓ Connected: {}", serde_json::to_string(&accessory)?);
    println!();

    // ========================================================================
    // Write
    // ========================================================================

    println!("[3] Writing...");

    serial.write(b"AB".to_vec()).await?;
    peer.grant(2);
    // Round trip through the reactor so the grant is applied
    let _ = serial.read().await?;

    println!("    ✓ Peer received: {:?}\n", peer.take_written());

    // ========================================================================
    // Read
    // ========================================================================

    println!("[4] Reading...");

    peer.send(b"C\nD".to_vec());
    let record = serial.read_until(b"\n".to_vec()).await?;
    println!("    ✓ Record: {record:?}");
    let rest = serial.read().await?;
    println!("    ✓ Rest: {rest:?}\n");

    // ========================================================================
    // Detach
    // ========================================================================

    println!("[5] Detaching...");

    serial.accessory_events().detached(accessory.connection_id);
    if let Some(event) = events.recv().await {
        println!("    ✓ Event: {}", serde_json::to_string(&event)?);
    }
    println!("    ✓ Connected: {}", serial.is_connected());

    serial.shutdown();
    println!("\n=== Done ===");
    Ok(())
}

//! # Relay Node
//!
//! Interactive demo of request/response over a one-way bus.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging + metrics)
//! 2. Load configuration from `RELAY_*` environment variables
//! 3. Create the bus and start the request service
//! 4. Run the console loop until `quit`, end of input, or Ctrl+C while idle
//!
//! Ctrl+C while a request is in flight cancels just that request.

use anyhow::{Context, Result};
use relay_node::{block_on_detached, run_console, Interrupt, NodeConfig, RelayNode};
use relay_telemetry::{init_telemetry, TelemetryConfig};
use tokio::io::BufReader;
use tracing::{info, warn};

fn main() -> Result<()> {
    block_on_detached(run()).context("Failed to build runtime")?
}

async fn run() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_service("relay-node"))
        .context("Failed to initialize telemetry")?;

    let config = NodeConfig::from_env().context("Invalid configuration")?;

    let node = RelayNode::start(config)
        .await
        .context("Failed to start request service")?;

    let interrupt = Interrupt::new();
    let signals = interrupt.clone();
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            if !signals.trigger() {
                info!("Interrupted, exiting");
                return;
            }
        }
    });

    let client = node.client();
    let result = run_console(
        &client,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        &interrupt,
    )
    .await
    .context("Console I/O failed");

    drop(client);
    node.shutdown();
    result
}

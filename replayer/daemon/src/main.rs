//! Data Replayer - Simulated Device over TCP
//!
//! Replays a recorded trace (one message per line) to a peer, pretending to
//! be the device the trace was captured from.
//!
//! # Usage
//!
//! ```bash
//! # Wait for a consumer on 0.0.0.0:2112 and replay the default recording
//! data-replayer
//!
//! # Connect to a consumer and replay a hex recording every 50 ms
//! data-replayer --client --ip 192.168.0.10 --hex -n -t 0.05 -f scan.rec
//!
//! # Verbose logging (inbound data is logged at debug level)
//! data-replayer -v
//! RUST_LOG=replayer_core=trace data-replayer
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: stop replaying and exit

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use replayer_core::{spawn_receiver, Connection, ReplayStats, Replayer};

use cli::Args;

/// Initialize logging; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "replayer_daemon={level},replayer_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(())
}

/// Resolve once Ctrl+C or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = args.resolve()?;
    let endpoint = config.endpoint();
    let pacing = config.pacing_interval()?;
    let establish_timeout = config.establish_timeout()?;

    info!(
        role = %config.role,
        endpoint = %endpoint,
        recording = ?config.recording,
        pacing = ?pacing,
        hex = config.hex,
        "Data replayer starting"
    );

    let connection = tokio::select! {
        connection = Connection::establish(config.role, &endpoint, establish_timeout) => {
            connection.with_context(|| format!("No {} connection on {endpoint}", config.role))?
        }
        _ = shutdown_signal() => return Ok(()),
    };
    info!(peer = %connection.peer_addr(), "Connection established");

    let (inbound, outbound) = connection.split(config.keep_open);
    let stats = Arc::new(ReplayStats::new());
    let receiver = spawn_receiver(inbound, config.receiver_config(), Arc::clone(&stats));

    let mut replayer = Replayer::new(
        outbound,
        config.line_transform(),
        pacing,
        Arc::clone(&stats),
    );

    tokio::select! {
        snapshot = replayer.run(&config.recording, config.max_cycles) => {
            info!(
                msgs_sent = snapshot.messages_sent,
                bytes_sent = snapshot.bytes_sent,
                bytes_received = snapshot.bytes_received,
                cycles = snapshot.cycles_completed,
                "Replay finished"
            );
        }
        _ = shutdown_signal() => {
            info!(msgs_sent = stats.messages_sent(), "Replay interrupted");
        }
    }

    receiver.abort();
    info!("Data replayer stopped");
    Ok(())
}

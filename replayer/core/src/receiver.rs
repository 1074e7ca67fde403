//! Receiver Task
//!
//! Drains whatever the peer sends so its socket buffers never fill up and the
//! traffic shows up in the debug log. The receiver never writes and never
//! gates the replayer: it runs as its own task on the read half only.
//!
//! # Loop
//!
//! - non-empty read: count and log the bytes
//! - empty read: pause `idle_backoff`, retry; after `max_empty_reads` empty
//!   reads in a row the peer is gone and the task ends
//! - read error: log and end the task

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::ReplayError;
use crate::stats::ReplayStats;
use crate::transport::{InboundHalf, PayloadSource};

/// Bytes requested per read
pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

/// Pause after an empty read
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(100);

/// Consecutive empty reads before the peer is considered closed
pub const DEFAULT_MAX_EMPTY_READS: u32 = 10;

/// Receiver tuning
#[derive(Clone, Debug)]
pub struct ReceiverConfig {
    pub buffer_size: usize,
    pub idle_backoff: Duration,
    pub max_empty_reads: u32,
    /// Log inbound data as hex instead of lossy UTF-8
    pub log_as_hex: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            max_empty_reads: DEFAULT_MAX_EMPTY_READS,
            log_as_hex: false,
        }
    }
}

/// Why the receiver task ended
#[derive(Debug)]
pub enum ReceiverExit {
    /// The peer stopped sending and closed its side
    PeerClosed,
    /// A hard read error occurred
    ReadFailed(ReplayError),
}

/// Spawn the receiver for `inbound` on the current runtime
pub fn spawn_receiver(
    inbound: InboundHalf,
    config: ReceiverConfig,
    stats: Arc<ReplayStats>,
) -> JoinHandle<ReceiverExit> {
    let span = tracing::info_span!("receiver", peer = %inbound.peer_addr());
    tokio::spawn(receive_loop(inbound, config, stats).instrument(span))
}

/// Receive until the peer closes or a read fails
pub async fn receive_loop<R>(
    mut source: R,
    config: ReceiverConfig,
    stats: Arc<ReplayStats>,
) -> ReceiverExit
where
    R: PayloadSource,
{
    let max = config.buffer_size.max(1);
    let mut empty_reads: u32 = 0;

    loop {
        match source.receive(max).await {
            Ok(data) if data.is_empty() => {
                empty_reads += 1;
                if empty_reads >= config.max_empty_reads {
                    tracing::info!(empty_reads, "Peer closed the connection, receiver stopping");
                    return ReceiverExit::PeerClosed;
                }
                tokio::time::sleep(config.idle_backoff).await;
            }
            Ok(data) => {
                empty_reads = 0;
                let n = data.len();
                stats.record_received(n);

                if config.log_as_hex {
                    tracing::debug!(bytes = n, data = %hex::encode(&data), "Received");
                } else {
                    tracing::debug!(bytes = n, data = %String::from_utf8_lossy(&data), "Received");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Read error, receiver stopping");
                return ReceiverExit::ReadFailed(e);
            }
        }
    }
}

//! Replayer Core - Recorded Trace Replay over TCP
//!
//! This crate replays a captured communication trace (one message per line)
//! over a single TCP connection so that a recording can stand in for a real
//! device such as a LIDAR sensor.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   recording ───►│ Replayer                                     │
//!   (reopened     │  read line ─► LineTransform ─► pace ─► send  │
//!    per cycle)   └──────────────────────────────┬───────────────┘
//!                                                │ PayloadSink
//!                                          ┌─────▼──────┐
//!                                          │OutboundHalf│──► peer
//!                 ┌──────────────┐         ├────────────┤
//!   debug log ◄───│ Receiver task│◄────────│InboundHalf │◄── peer
//!                 └──────────────┘         └────────────┘
//!                                           Connection
//!                                     (server: accept once,
//!                                      client: connect once)
//! ```
//!
//! # Key Types
//!
//! - [`Connection`]: the single TCP connection, built with
//!   [`Connection::as_server`] or [`Connection::as_client`]
//! - [`LineTransform`]: recorded line to wire payload
//! - [`Replayer`]: paced sender with [`Replayer::run_cycle`] and [`Replayer::run`]
//! - [`spawn_receiver`]: background drain of inbound data
//! - [`ReplayStats`]: shared counters, including the send counter
//! - [`ReplayConfig`]: layered configuration
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use replayer_core::{spawn_receiver, Connection, ReplayConfig, ReplayStats, Replayer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ReplayConfig::default();
//!     let connection =
//!         Connection::establish(config.role, &config.endpoint(), None).await?;
//!     let (inbound, outbound) = connection.split(config.keep_open);
//!
//!     let stats = Arc::new(ReplayStats::new());
//!     spawn_receiver(inbound, config.receiver_config(), Arc::clone(&stats));
//!
//!     let mut replayer =
//!         Replayer::new(outbound, config.line_transform(), config.pacing_interval()?, stats);
//!     replayer.run(&config.recording, None).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod receiver;
pub mod replayer;
pub mod stats;
pub mod transform;
pub mod transport;

pub use config::{load_config_from_path, ConfigError, ConfigOverrides, ReplayConfig};
pub use error::{ConnectOp, ReplayError, Result};
pub use receiver::{receive_loop, spawn_receiver, ReceiverConfig, ReceiverExit};
pub use replayer::{CycleReport, Replayer};
pub use stats::{ReplayStats, StatsSnapshot};
pub use transform::{strip_inline_markers, LineTransform, PayloadEncoding};
pub use transport::{
    Connection, Endpoint, InboundHalf, OutboundHalf, PayloadSink, PayloadSource, Role,
    ServerEndpoint,
};

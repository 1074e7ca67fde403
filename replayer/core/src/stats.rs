//! Replay Statistics
//!
//! Process-wide counters shared between the replayer and the receiver task.
//! Each counter has a single writer; readers only take snapshots for logging.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared counters, wrap in an `Arc` to hand to tasks
#[derive(Debug, Default)]
pub struct ReplayStats {
    messages_sent: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    cycles_completed: AtomicU64,
}

/// Point-in-time copy of [`ReplayStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub cycles_completed: u64,
}

impl ReplayStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successfully transmitted payload
    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record bytes drained by the receiver
    pub fn record_received(&self, bytes: usize) {
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record one recording replayed start to end
    pub fn record_cycle(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// The send counter
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
        }
    }
}

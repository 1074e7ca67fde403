//! Replayer
//!
//! Streams a recording line by line through a [`PayloadSink`], pacing every
//! send, and repeats the whole recording cycle after cycle.
//!
//! # Failure policy
//!
//! | Error | Effect |
//! |-------|--------|
//! | recording missing or unreadable | cycle sends nothing, driver retries |
//! | line not valid UTF-8 | line skipped, cycle continues |
//! | malformed hex line | line skipped, cycle continues |
//! | send failure | cycle aborted, driver retries |
//!
//! The recording is reopened for every cycle so it can be fixed or swapped
//! while the replayer is running.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{ReplayError, Result};
use crate::stats::{ReplayStats, StatsSnapshot};
use crate::transform::LineTransform;
use crate::transport::PayloadSink;

/// Outcome of one pass over the recording
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Lines read from the recording
    pub lines_read: usize,
    /// Payloads transmitted
    pub sent: usize,
    /// Lines dropped because they could not be encoded
    pub skipped: usize,
}

/// Paced line-by-line sender
pub struct Replayer<S> {
    sink: S,
    transform: LineTransform,
    pacing: Duration,
    stats: Arc<ReplayStats>,
}

impl<S: PayloadSink> Replayer<S> {
    /// Create a replayer that sends through `sink`, waiting `pacing` before
    /// every payload and counting into `stats`
    pub fn new(
        sink: S,
        transform: LineTransform,
        pacing: Duration,
        stats: Arc<ReplayStats>,
    ) -> Self {
        Self {
            sink,
            transform,
            pacing,
            stats,
        }
    }

    /// Counters shared with the receiver task
    #[must_use]
    pub fn stats(&self) -> &Arc<ReplayStats> {
        &self.stats
    }

    /// The sink payloads are written to
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the replayer and return its sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Replay the recording once, start to end
    ///
    /// # Errors
    ///
    /// - `ReplayError::File` if the recording cannot be opened or read;
    ///   lines that are not valid UTF-8 are skipped, not reported
    /// - `ReplayError::Io` if a send fails; no further lines are sent
    pub async fn run_cycle(&mut self, source: &Path) -> Result<CycleReport> {
        let file_err = |source_err| ReplayError::File {
            path: source.to_path_buf(),
            source: source_err,
        };

        let file = File::open(source).await.map_err(file_err)?;
        let mut reader = BufReader::new(file);
        let mut raw = Vec::new();
        let mut report = CycleReport::default();

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw).await.map_err(file_err)? == 0 {
                break;
            }
            report.lines_read += 1;
            let line_no = report.lines_read;

            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(line = line_no, error = %e, "Skipping corrupt line");
                    report.skipped += 1;
                    continue;
                }
            };
            tracing::trace!(line = line_no, raw = %line.trim_end(), "Read line");

            let payload = match self.transform.apply(line) {
                Ok(payload) => payload,
                Err(e) if e.is_line_local() => {
                    tracing::warn!(line = line_no, error = %e, "Skipping line");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            tokio::time::sleep(self.pacing).await;

            if let Err(e) = self.sink.send(&payload).await {
                tracing::error!(line = line_no, error = %e, "Send failed, aborting cycle");
                return Err(e);
            }
            self.stats.record_sent(payload.len());
            report.sent += 1;
        }

        tracing::debug!(
            lines = report.lines_read,
            sent = report.sent,
            skipped = report.skipped,
            "Replay messages sent"
        );

        if let Err(e) = self.sink.finish_cycle().await {
            tracing::warn!(error = %e, "End of cycle close failed");
        }
        self.stats.record_cycle();

        Ok(report)
    }

    /// Replay cycle after cycle
    ///
    /// Runs forever when `max_cycles` is `None`. Failed cycles count towards
    /// the limit. Every cycle is followed by one pacing interval of rest.
    pub async fn run(&mut self, source: &Path, max_cycles: Option<u64>) -> StatsSnapshot {
        let mut attempts: u64 = 0;

        loop {
            match self.run_cycle(source).await {
                Ok(report) => {
                    tracing::debug!(
                        sent = report.sent,
                        skipped = report.skipped,
                        "Cycle complete"
                    );
                }
                Err(e @ ReplayError::File { .. }) => {
                    tracing::error!(error = %e, "Recording unavailable, retrying");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Cycle aborted");
                }
            }
            attempts += 1;

            if max_cycles.is_some_and(|max| attempts >= max) {
                let snapshot = self.stats.snapshot();
                tracing::info!(
                    cycles = attempts,
                    msgs_sent = snapshot.messages_sent,
                    "Cycle limit reached"
                );
                return snapshot;
            }

            tokio::time::sleep(self.pacing).await;
            tracing::info!("resending...");
            tracing::info!(msgs_sent = self.stats.messages_sent(), "Progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::PayloadEncoding;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    /// In-memory sink that records payloads and can fail on demand
    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<Vec<u8>>,
        fail_on: Option<usize>,
        finished_cycles: usize,
    }

    #[async_trait]
    impl PayloadSink for RecordingSink {
        async fn send(&mut self, payload: &[u8]) -> Result<()> {
            if self.fail_on == Some(self.sent.len()) {
                return Err(ReplayError::Io {
                    op: "send",
                    source: io::Error::from(io::ErrorKind::BrokenPipe),
                });
            }
            self.sent.push(payload.to_vec());
            Ok(())
        }

        async fn finish_cycle(&mut self) -> Result<()> {
            self.finished_cycles += 1;
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }
    }

    fn recording(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn replayer(sink: RecordingSink, transform: LineTransform) -> Replayer<RecordingSink> {
        Replayer::new(sink, transform, Duration::ZERO, Arc::new(ReplayStats::new()))
    }

    fn stripping_replayer(encoding: PayloadEncoding) -> Replayer<RecordingSink> {
        replayer(
            RecordingSink::default(),
            LineTransform::new(true, encoding),
        )
    }

    #[tokio::test]
    async fn test_cycle_sends_lines_in_order() {
        let file = recording(&["$12:00$first", "second$note$", "third"]);
        let mut replayer = stripping_replayer(PayloadEncoding::Text);

        let report = replayer.run_cycle(file.path()).await.unwrap();

        assert_eq!(
            report,
            CycleReport {
                lines_read: 3,
                sent: 3,
                skipped: 0
            }
        );
        let sink = replayer.into_sink();
        assert_eq!(
            sink.sent,
            vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]
        );
        assert_eq!(sink.finished_cycles, 1);
    }

    #[tokio::test]
    async fn test_newlines_preserved_by_default() {
        let file = recording(&["a", "b"]);
        let mut replayer = replayer(RecordingSink::default(), LineTransform::default());

        replayer.run_cycle(file.path()).await.unwrap();

        assert_eq!(replayer.sink().sent, vec![b"a\n".to_vec(), b"b\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_counter_across_cycles() {
        let file = recording(&["1", "2", "3", "4", "5"]);
        let mut replayer = replayer(RecordingSink::default(), LineTransform::default());

        for _ in 0..3 {
            replayer.run_cycle(file.path()).await.unwrap();
        }

        assert_eq!(replayer.stats().messages_sent(), 15);
        assert_eq!(replayer.stats().snapshot().cycles_completed, 3);
    }

    #[tokio::test]
    async fn test_bad_hex_line_is_skipped() {
        let file = recording(&["deadbeef", "abc", "zz", "0102"]);
        let mut replayer = stripping_replayer(PayloadEncoding::Hex);

        let report = replayer.run_cycle(file.path()).await.unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(
            replayer.sink().sent,
            vec![vec![0xDE, 0xAD, 0xBE, 0xEF], vec![0x01, 0x02]]
        );
        assert_eq!(replayer.stats().messages_sent(), 2);
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"first\n\xff\xfebad\nthird\n").unwrap();
        file.flush().unwrap();
        let mut replayer = replayer(RecordingSink::default(), LineTransform::default());

        let report = replayer.run_cycle(file.path()).await.unwrap();

        assert_eq!(
            report,
            CycleReport {
                lines_read: 3,
                sent: 2,
                skipped: 1
            }
        );
        let sink = replayer.into_sink();
        assert_eq!(sink.sent, vec![b"first\n".to_vec(), b"third\n".to_vec()]);
        assert_eq!(sink.finished_cycles, 1);
    }

    #[tokio::test]
    async fn test_send_failure_aborts_cycle() {
        let file = recording(&["a", "b", "c"]);
        let sink = RecordingSink {
            fail_on: Some(1),
            ..Default::default()
        };
        let mut replayer = replayer(sink, LineTransform::default());

        let result = replayer.run_cycle(file.path()).await;

        assert!(matches!(result, Err(ReplayError::Io { op: "send", .. })));
        assert_eq!(replayer.stats().messages_sent(), 1);
        assert_eq!(replayer.sink().sent.len(), 1);
        assert_eq!(replayer.sink().finished_cycles, 0);
    }

    #[tokio::test]
    async fn test_missing_recording_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut replayer = replayer(RecordingSink::default(), LineTransform::default());

        let result = replayer.run_cycle(&dir.path().join("missing.rec")).await;

        assert!(matches!(result, Err(ReplayError::File { .. })));
        assert_eq!(replayer.stats().messages_sent(), 0);
    }

    #[tokio::test]
    async fn test_run_survives_missing_file_and_stops_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut replayer = replayer(RecordingSink::default(), LineTransform::default());

        let snapshot = replayer.run(&dir.path().join("missing.rec"), Some(3)).await;

        assert_eq!(snapshot.messages_sent, 0);
        assert_eq!(snapshot.cycles_completed, 0);
    }

    #[tokio::test]
    async fn test_run_repeats_recording() {
        let file = recording(&["x", "y"]);
        let mut replayer = stripping_replayer(PayloadEncoding::Text);

        let snapshot = replayer.run(file.path(), Some(4)).await;

        assert_eq!(snapshot.messages_sent, 8);
        assert_eq!(snapshot.cycles_completed, 4);
        assert_eq!(replayer.sink().finished_cycles, 4);
    }

    #[tokio::test]
    async fn test_empty_line_still_sent() {
        let file = recording(&["", "$note only$"]);
        let mut replayer = stripping_replayer(PayloadEncoding::Text);

        let report = replayer.run_cycle(file.path()).await.unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(replayer.sink().sent, vec![Vec::<u8>::new(), Vec::new()]);
    }
}

//! # Sluice Metrics
//!
//! Run-wide counters and structured logging.
//!
//! Each worker folds its per-file [`DecodeStats`] and [`JoinStats`] into the
//! global [`PipelineMetrics`], which keeps running totals and mirrors them
//! into `metrics` counters for whichever recorder the host installs.

use metrics::counter;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use sluice_join::{JoinStats, Outcome};
use sluice_pcap::DecodeStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub mod tracing_setup;

/// Global metrics instance.
static METRICS: OnceCell<PipelineMetrics> = OnceCell::new();

/// Gets or initializes the global metrics instance.
pub fn metrics() -> &'static PipelineMetrics {
    METRICS.get_or_init(PipelineMetrics::new)
}

/// Counters across every capture of a run.
pub struct PipelineMetrics {
    start_time: Instant,

    /// Captures processed, including ones abandoned on a read error.
    files_total: AtomicU64,

    /// Captures abandoned on a read error.
    files_failed: AtomicU64,

    /// Records written.
    records_total: AtomicU64,

    totals: Mutex<Totals>,
}

#[derive(Default)]
struct Totals {
    decode: DecodeStats,
    join: JoinStats,
}

/// Point-in-time view of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Captures processed, including ones abandoned on a read error.
    pub files: u64,
    /// Captures abandoned on a read error.
    pub files_failed: u64,
    /// Records written.
    pub records: u64,
    /// Summed decode counters.
    pub decode: DecodeStats,
    /// Summed join counters.
    pub join: JoinStats,
}

impl PipelineMetrics {
    /// Creates a new metrics instance.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            files_total: AtomicU64::new(0),
            files_failed: AtomicU64::new(0),
            records_total: AtomicU64::new(0),
            totals: Mutex::new(Totals::default()),
        }
    }

    /// Time since the run started.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Folds in the counters of one finished capture.
    pub fn record_file(&self, decode: &DecodeStats, join: &JoinStats) {
        self.files_total.fetch_add(1, Ordering::Relaxed);

        counter!("sluice_frames_total").increment(decode.frames);
        counter!("sluice_packets_total").increment(decode.packets);
        for (kind, count) in decode.error_counts() {
            if count > 0 {
                counter!("sluice_decode_errors_total", "kind" => kind.as_str()).increment(count);
            }
        }

        let mut totals = self.totals.lock();
        totals.decode.merge(decode);
        totals.join.merge(join);
    }

    /// Records a capture abandoned on a read error.
    pub fn record_failed_file(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
        counter!("sluice_files_failed_total").increment(1);
    }

    /// Records one written DNS record.
    pub fn record_joined(&self, outcome: Outcome) {
        self.records_total.fetch_add(1, Ordering::Relaxed);
        counter!("sluice_joined_total", "outcome" => outcome.as_str()).increment(1);
    }

    /// Records one written ICMP record.
    pub fn record_icmp(&self) {
        self.records_total.fetch_add(1, Ordering::Relaxed);
        counter!("sluice_icmp_total").increment(1);
    }

    /// Returns the current totals.
    pub fn snapshot(&self) -> Snapshot {
        let totals = self.totals.lock();
        Snapshot {
            files: self.files_total.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            records: self.records_total.load(Ordering::Relaxed),
            decode: totals.decode,
            join: totals.join,
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_file_sums() {
        let metrics = PipelineMetrics::new();
        let decode = DecodeStats {
            frames: 10,
            packets: 8,
            truncated: 2,
            ..Default::default()
        };
        let join = JoinStats {
            matched: 4,
            ..Default::default()
        };
        metrics.record_file(&decode, &join);
        metrics.record_file(&decode, &join);
        metrics.record_failed_file();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files, 2);
        assert_eq!(snapshot.files_failed, 1);
        assert_eq!(snapshot.decode.frames, 20);
        assert_eq!(snapshot.decode.truncated, 4);
        assert_eq!(snapshot.join.matched, 8);
    }

    #[test]
    fn test_failed_file_counts_as_processed() {
        let metrics = PipelineMetrics::new();
        let decode = DecodeStats {
            frames: 3,
            ..Default::default()
        };
        // A capture that errors midway still reports what it decoded.
        metrics.record_failed_file();
        metrics.record_file(&decode, &JoinStats::default());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files, 1);
        assert_eq!(snapshot.files_failed, 1);
        assert_eq!(snapshot.decode.frames, 3);
    }

    #[test]
    fn test_record_outputs() {
        let metrics = PipelineMetrics::new();
        metrics.record_joined(Outcome::Matched);
        metrics.record_joined(Outcome::Expired);
        metrics.record_icmp();
        assert_eq!(metrics.snapshot().records, 3);
        assert!(metrics.uptime() >= Duration::ZERO);
    }
}

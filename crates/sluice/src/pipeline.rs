//! Multi-file decode pipeline.
//!
//! ```text
//! file 1 -> PacketReader -> Joiner --\
//! file 2 -> PacketReader -> Joiner ----> bounded queue -> JSON lines writer
//! file N -> PacketReader -> Joiner --/
//! ```
//!
//! Decoding is synchronous, so each capture runs on the blocking pool and
//! hands records to the queue with `blocking_send`. A full queue blocks the
//! decoders until the writer catches up.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sluice_config::Config;
use sluice_join::{JoinStats, Joiner, Output};
use sluice_metrics::metrics;
use sluice_pcap::{DecodeStats, PacketReader, Timestamp};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, instrument, warn};

/// Outcome of one capture.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    /// The capture.
    pub path: PathBuf,
    /// Reader counters.
    pub decode: DecodeStats,
    /// Joiner counters.
    pub join: JoinStats,
    /// Why reading stopped early, if it did.
    pub error: Option<String>,
}

impl FileSummary {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            decode: DecodeStats::default(),
            join: JoinStats::default(),
            error: None,
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Per-capture results, in argument order.
    pub files: Vec<FileSummary>,
    /// Records written.
    pub records: u64,
}

impl RunSummary {
    /// Captures that stopped on an error.
    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }
}

/// Decodes and joins every capture in `files`, writing JSON lines to `writer`.
///
/// A capture that cannot be read is reported in its [`FileSummary`] and does
/// not stop the others. Only a write failure fails the run.
pub async fn run<W>(files: Vec<PathBuf>, config: Arc<Config>, writer: W) -> Result<RunSummary>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let started_at = Utc::now();
    let start = Instant::now();

    let (tx, rx) = mpsc::channel(config.pipeline.queue_capacity);
    let writer = tokio::spawn(write_records(rx, writer));

    let workers = Arc::new(Semaphore::new(config.pipeline.effective_workers()));
    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let permit = workers
            .clone()
            .acquire_owned()
            .await
            .context("worker pool closed")?;
        let tx = tx.clone();
        let config = config.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let summary = process_file(&path, &config, &tx);
            drop(permit);
            summary
        }));
    }
    drop(tx);

    let mut summaries = Vec::with_capacity(handles.len());
    for handle in handles {
        summaries.push(handle.await.context("decode worker panicked")?);
    }
    let records = writer.await.context("writer task panicked")??;

    let summary = RunSummary {
        started_at,
        elapsed: start.elapsed(),
        files: summaries,
        records,
    };
    info!(
        files = summary.files.len(),
        failed = summary.failed(),
        records,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run complete"
    );
    Ok(summary)
}

/// Reads one capture to the end, sending every record it yields.
#[instrument(skip_all, fields(file = %path.display()))]
fn process_file(path: &Path, config: &Config, tx: &mpsc::Sender<Output>) -> FileSummary {
    let mut summary = FileSummary::new(path);

    let mut reader = match PacketReader::open(path, Arc::new(config.reader.clone())) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(error = %e, "cannot read capture");
            summary.error = Some(e.to_string());
            metrics().record_failed_file();
            return summary;
        }
    };
    debug!(
        link_type = reader.header().link_type,
        snaplen = reader.header().snaplen,
        "capture opened"
    );

    let mut joiner = Joiner::new(config.joiner.clone());
    let interval = config.joiner.timeout_secs;
    let mut next_purge: Option<Timestamp> = None;
    let mut open = true;

    for packet in reader.by_ref() {
        let packet = match packet {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, "capture read failed");
                summary.error = Some(e.to_string());
                break;
            }
        };

        let ts = packet.ts();
        let mut out = joiner.on_packet(packet);
        match next_purge {
            Some(due) if ts >= due => {
                out.extend(joiner.purge());
                next_purge = Some(ts.add_secs(interval));
            }
            None => next_purge = Some(ts.add_secs(interval)),
            Some(_) => {}
        }

        if !send(tx, out) {
            open = false;
            break;
        }
    }
    if open && !send(tx, joiner.drain()) {
        open = false;
    }
    if !open {
        debug!("writer closed; abandoning capture");
    }

    summary.decode = *reader.stats();
    summary.join = *joiner.stats();
    if summary.error.is_some() {
        metrics().record_failed_file();
    }
    metrics().record_file(&summary.decode, &summary.join);

    info!(
        frames = summary.decode.frames,
        packets = summary.decode.packets,
        errors = summary.decode.errors(),
        matched = summary.join.matched,
        expired = summary.join.expired,
        unmatched = summary.join.unmatched_responses,
        "capture done"
    );
    summary
}

/// Returns false once the writer has gone away.
fn send(tx: &mpsc::Sender<Output>, out: Vec<Output>) -> bool {
    out.into_iter().all(|output| tx.blocking_send(output).is_ok())
}

async fn write_records<W>(mut rx: mpsc::Receiver<Output>, mut writer: W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::with_capacity(1024);
    let mut written = 0u64;
    while let Some(output) = rx.recv().await {
        line.clear();
        serde_json::to_writer(&mut line, &output)?;
        line.push(b'\n');
        writer.write_all(&line).await.context("writing record")?;

        match &output {
            Output::Dns(record) => metrics().record_joined(record.outcome()),
            Output::Icmp(_) => metrics().record_icmp(),
        }
        written += 1;
    }
    writer.flush().await.context("flushing records")?;
    Ok(written)
}

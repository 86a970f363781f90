//! The Packet Reader: drives one capture file through the decoder.

use crate::capture::{self, CaptureHeader, FRAME_HEADER_SIZE, GLOBAL_HEADER_SIZE};
use crate::config::ReaderConfig;
use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::link::LinkType;
use crate::packet::{Packet, Timestamp};
use crate::stats::DecodeStats;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Iterator over the decoded packets of one capture.
///
/// Frames that cannot be decoded are counted in [`DecodeStats`] and
/// skipped. Only a read failure of the underlying source is yielded as an
/// error, after which the iterator is exhausted.
pub struct PacketReader<R> {
    source: R,
    header: CaptureHeader,
    link: Option<LinkType>,
    decoder: Decoder,
    purge_interval: u64,
    max_frame_size: usize,
    next_purge: Option<Timestamp>,
    last_ts: Timestamp,
    frame: Vec<u8>,
    done: bool,
}

impl PacketReader<Box<dyn Read + Send>> {
    /// Opens a capture file, decompressing by extension.
    pub fn open(path: impl AsRef<Path>, config: Arc<ReaderConfig>) -> Result<Self> {
        let source = capture::open(path.as_ref())?;
        Self::new(source, config)
    }
}

impl<R: Read> PacketReader<R> {
    /// Reads the global header from `source`.
    pub fn new(mut source: R, config: Arc<ReaderConfig>) -> Result<Self> {
        let mut buf = [0u8; GLOBAL_HEADER_SIZE];
        let read = capture::read_full(&mut source, &mut buf)?;
        if read < GLOBAL_HEADER_SIZE {
            return Err(Error::EmptyCapture { read });
        }
        let header = CaptureHeader::parse(&buf)?;

        let link = match header.link() {
            Ok(link) => Some(link),
            Err(e) => {
                warn!(error = %e, "capture has no IP locator; every frame will be skipped");
                None
            }
        };

        Ok(Self {
            source,
            header,
            link,
            purge_interval: config.purge_interval_secs,
            max_frame_size: config.max_frame_size,
            decoder: Decoder::new(config),
            next_purge: None,
            last_ts: Timestamp::default(),
            frame: Vec::new(),
            done: false,
        })
    }

    /// The capture's global header.
    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }

    /// Counters so far.
    pub fn stats(&self) -> &DecodeStats {
        self.decoder.stats()
    }

    /// Capture time of the most recent frame.
    pub fn last_timestamp(&self) -> Timestamp {
        self.last_ts
    }

    /// Reads the next frame into the frame buffer.
    ///
    /// Returns `None` at the end of the capture, including when the last
    /// frame is cut short.
    fn read_frame(&mut self) -> Result<Option<Timestamp>> {
        let limit = self.max_frame_size;
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        let read = capture::read_full(&mut self.source, &mut buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read < FRAME_HEADER_SIZE {
            warn!(read, "capture ends inside a frame header");
            self.decoder.stats_mut().truncated += 1;
            return Ok(None);
        }

        let fh = self.header.frame_header(&buf);
        let ts = Timestamp::new(u64::from(fh.ts_sec), fh.ts_usec);
        if fh.caplen > limit {
            let skipped = io::copy(&mut (&mut self.source).take(fh.caplen as u64), &mut io::sink())?;
            if skipped < fh.caplen as u64 {
                warn!(caplen = fh.caplen, skipped, "capture ends inside an oversized frame");
                return Ok(None);
            }
            return Err(Error::OversizedFrame {
                caplen: fh.caplen,
                limit,
            });
        }

        self.frame.resize(fh.caplen, 0);
        let read = capture::read_full(&mut self.source, &mut self.frame)?;
        if read < fh.caplen {
            warn!(caplen = fh.caplen, read, "capture ends inside a frame");
            self.decoder.stats_mut().truncated += 1;
            return Ok(None);
        }
        Ok(Some(ts))
    }

    fn maybe_purge(&mut self, ts: Timestamp) {
        let due = match self.next_purge {
            None => {
                self.next_purge = Some(ts.add_secs(self.purge_interval));
                return;
            }
            Some(due) => due,
        };
        if ts < due {
            return;
        }

        let purged = self.decoder.purge(ts);
        if purged.flows > 0 || purged.datagrams > 0 {
            let (flows, datagrams) = self.decoder.pending();
            info!(
                at = %ts,
                purged_flows = purged.flows,
                purged_datagrams = purged.datagrams,
                open_flows = flows,
                pending_datagrams = datagrams,
                "purged stale reassembly state"
            );
        }
        self.next_purge = Some(ts.add_secs(self.purge_interval));
    }
}

impl<R: Read> Iterator for PacketReader<R> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let ts = match self.read_frame() {
                Ok(Some(ts)) => ts,
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(e) if e.is_fatal() => {
                    self.done = true;
                    return Some(Err(e));
                }
                Err(e) => {
                    self.decoder.stats_mut().frames += 1;
                    self.decoder.stats_mut().record(e.kind());
                    debug!(error = %e, "skipping frame");
                    continue;
                }
            };

            self.decoder.stats_mut().frames += 1;
            self.last_ts = self.last_ts.max(ts);
            self.maybe_purge(ts);

            let Some(link) = self.link else {
                self.decoder.stats_mut().unsupported_link += 1;
                continue;
            };

            match self.decoder.decode_frame(link, ts, &self.frame) {
                Ok(Some(packet)) => {
                    self.decoder.stats_mut().packets += 1;
                    return Some(Ok(packet));
                }
                Ok(None) => {}
                Err(e) => {
                    let frame = self.decoder.stats().frames;
                    self.decoder.stats_mut().record(e.kind());
                    debug!(frame, at = %ts, error = %e, "skipping frame");
                }
            }
        }
        None
    }
}

use crate::checker::{Outcome, SiteReport};
use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

const BATCH_SIZE: usize = 100;
const FLUSH_INTERVAL_SECS: u64 = 5;
const CHANNEL_CAPACITY: usize = 256;

/// Buffered JSONL writer fed through a channel, one line per site.
pub struct ReportWriter {
    receiver: mpsc::Receiver<SiteReport>,
    writer: BufWriter<File>,
    batch: Vec<String>,
    last_flush: Instant,
}

impl ReportWriter {
    /// Creates (truncating) the report file and returns the writer together
    /// with the sender to feed it.
    pub fn new(path: &Path) -> Result<(Self, mpsc::Sender<SiteReport>)> {
        let file = File::create(path)?;
        let writer = BufWriter::with_capacity(8192, file);
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

        Ok((
            Self {
                receiver,
                writer,
                batch: Vec::with_capacity(BATCH_SIZE),
                last_flush: Instant::now(),
            },
            sender,
        ))
    }

    /// Drains the channel until every sender is dropped. Run this in a tokio task.
    pub async fn run(mut self) -> Result<()> {
        while let Some(report) = self.receiver.recv().await {
            if let Err(e) = self.add_to_batch(&report) {
                warn!(site = %report.site.link, error = %e, "failed to serialize report line");
                continue;
            }

            if self.should_flush() {
                self.flush()?;
            }
        }

        self.flush()
    }

    fn add_to_batch(&mut self, report: &SiteReport) -> Result<()> {
        self.batch.push(serde_json::to_string(report)?);
        Ok(())
    }

    fn should_flush(&self) -> bool {
        self.batch.len() >= BATCH_SIZE
            || self.last_flush.elapsed() >= Duration::from_secs(FLUSH_INTERVAL_SECS)
    }

    fn flush(&mut self) -> Result<()> {
        for line in self.batch.drain(..) {
            writeln!(self.writer, "{line}")?;
        }
        self.writer.flush()?;
        self.last_flush = Instant::now();
        Ok(())
    }
}

/// Outcome counts for the end-of-run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub confirmed: usize,
    pub title_mismatch: usize,
    pub page_not_found: usize,
    pub page_empty: usize,
}

impl Summary {
    pub fn from_reports(reports: &[SiteReport]) -> Self {
        reports.iter().fold(Self::default(), |mut s, r| {
            s.total += 1;
            match r.outcome {
                Outcome::Confirmed => s.confirmed += 1,
                Outcome::TitleMismatch { .. } => s.title_mismatch += 1,
                Outcome::PageNotFound => s.page_not_found += 1,
                Outcome::PageEmpty => s.page_empty += 1,
            }
            s
        })
    }

    pub fn needs_manual_check(&self) -> usize {
        self.total - self.confirmed
    }

    pub fn log(&self) {
        info!(
            total = self.total,
            confirmed = self.confirmed,
            title_mismatch = self.title_mismatch,
            page_not_found = self.page_not_found,
            page_empty = self.page_empty,
            "checked {} sites: {} confirmed, {} need a manual check",
            self.total,
            self.confirmed,
            self.needs_manual_check()
        );
        info!("results are heuristic, please verify them on the sites themselves");
    }
}

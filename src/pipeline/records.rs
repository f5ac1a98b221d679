//! Detail extraction over collected handles.

use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{BidField, BidRecord, RecordHandle};
use crate::scrapers::{ScrapeError, TieredFetcher};

/// Records extracted from a list of handles, in handle order.
#[derive(Debug, Default)]
pub struct RecordBatch {
    pub records: Vec<BidRecord>,
    /// One entry per handle that produced no record.
    pub skipped: Vec<ScrapeError>,
    pub cancelled: bool,
}

/// Fetches detail pages one at a time.
#[derive(Default)]
pub struct RecordPipeline {
    progress: Option<ProgressBar>,
}

impl RecordPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report progress on `bar`; its length is set per run.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub async fn run(
        &self,
        fetcher: &mut TieredFetcher,
        handles: &[RecordHandle],
        cancel: &CancellationToken,
    ) -> RecordBatch {
        let mut batch = RecordBatch::default();
        if let Some(ref bar) = self.progress {
            bar.set_length(handles.len() as u64);
            bar.set_position(0);
        }

        for (i, handle) in handles.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    "Cancelled after {} of {} records",
                    batch.records.len(),
                    handles.len()
                );
                batch.cancelled = true;
                break;
            }

            match fetcher.fetch_detail(handle).await {
                Ok(record) => {
                    debug!(
                        "[{}/{}] {}",
                        i + 1,
                        handles.len(),
                        record.get(BidField::ConstructionName)
                    );
                    batch.records.push(record);
                }
                Err(e) => {
                    warn!("Skipping record: {}", e);
                    batch.skipped.push(e);
                }
            }

            if let Some(ref bar) = self.progress {
                bar.inc(1);
            }
        }

        if let Some(ref bar) = self.progress {
            bar.finish_and_clear();
        }
        batch
    }
}

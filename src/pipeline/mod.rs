//! Scrape pipeline: listing traversal, then detail extraction.

mod pagination;
mod records;
mod summary;

pub use pagination::{PaginationDriver, PaginationOutcome, DEFAULT_MAX_PAGES};
pub use records::{RecordBatch, RecordPipeline};
pub use summary::{RunOutcome, RunSummary};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::models::{BidRecord, DateRange};
use crate::scrapers::TieredFetcher;

/// Records scraped for one or more ranges, with the run accounting.
#[derive(Debug, Default)]
pub struct ScrapeRun {
    pub records: Vec<BidRecord>,
    pub summary: RunSummary,
}

impl ScrapeRun {
    /// Append another range's results.
    pub fn extend(&mut self, other: ScrapeRun) {
        self.records.extend(other.records);
        self.summary.merge(other.summary);
    }
}

/// Scrape a single range end to end.
pub async fn scrape_range(
    fetcher: &mut TieredFetcher,
    driver: &PaginationDriver,
    pipeline: &RecordPipeline,
    range: &DateRange,
    cancel: &CancellationToken,
) -> ScrapeRun {
    info!("Scraping bid results for {}", range);
    let mut summary = RunSummary::default();

    let listing = driver.collect(fetcher, range, cancel).await;
    summary.absorb_pagination(&listing);
    info!(
        "Found {} records across {} listing pages",
        listing.handles.len(),
        listing.pages_fetched
    );

    let batch = pipeline.run(fetcher, &listing.handles, cancel).await;
    summary.absorb_batch(&batch);

    ScrapeRun {
        records: batch.records,
        summary,
    }
}

/// Scrape several ranges in order, stopping early on cancellation.
pub async fn scrape_ranges(
    fetcher: &mut TieredFetcher,
    driver: &PaginationDriver,
    pipeline: &RecordPipeline,
    ranges: &[DateRange],
    cancel: &CancellationToken,
) -> ScrapeRun {
    let mut run = ScrapeRun::default();
    for range in ranges {
        if cancel.is_cancelled() {
            run.summary.cancelled = true;
            break;
        }
        run.extend(scrape_range(fetcher, driver, pipeline, range, cancel).await);
    }
    run
}

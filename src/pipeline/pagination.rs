//! Listing traversal.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::{DateRange, RecordHandle};
use crate::scrapers::{ScrapeError, TieredFetcher};

/// Default page ceiling.
pub const DEFAULT_MAX_PAGES: u32 = 200;

/// Handles collected from the listing, plus how traversal ended.
#[derive(Debug, Default)]
pub struct PaginationOutcome {
    pub handles: Vec<RecordHandle>,
    pub pages_fetched: u32,
    /// `ListingFetchFailed` or `PaginationLimitExceeded`, if traversal ended early.
    pub warning: Option<ScrapeError>,
    pub cancelled: bool,
}

impl PaginationOutcome {
    /// Zero-based page at which a listing failure stopped traversal.
    pub fn stopped_at_page(&self) -> Option<u32> {
        match self.warning {
            Some(ScrapeError::ListingFetchFailed { page, .. }) => Some(page),
            _ => None,
        }
    }

    pub fn hit_page_limit(&self) -> bool {
        matches!(
            self.warning,
            Some(ScrapeError::PaginationLimitExceeded { .. })
        )
    }
}

/// Walks result pages from page 0 while the listing reports a next page.
#[derive(Debug, Clone)]
pub struct PaginationDriver {
    max_pages: u32,
}

impl Default for PaginationDriver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGES)
    }
}

impl PaginationDriver {
    pub fn new(max_pages: u32) -> Self {
        Self {
            max_pages: max_pages.max(1),
        }
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Collect every record handle for `range`.
    ///
    /// A page failure ends traversal; handles from earlier pages are kept.
    pub async fn collect(
        &self,
        fetcher: &mut TieredFetcher,
        range: &DateRange,
        cancel: &CancellationToken,
    ) -> PaginationOutcome {
        let mut outcome = PaginationOutcome::default();
        let mut page = 0;

        loop {
            if cancel.is_cancelled() {
                info!("Cancelled before listing page {}", page);
                outcome.cancelled = true;
                break;
            }

            let listing = match fetcher.fetch_listing(range, page).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(
                        "Stopping pagination at page {} with {} handles collected: {}",
                        page,
                        outcome.handles.len(),
                        e
                    );
                    outcome.warning = Some(e);
                    break;
                }
            };

            outcome.pages_fetched += 1;
            info!(
                "Listing page {}: {} records{}",
                page,
                listing.records.len(),
                if listing.has_next { ", more pages" } else { "" }
            );
            outcome.handles.extend(listing.records);

            if !listing.has_next {
                break;
            }
            if outcome.pages_fetched >= self.max_pages {
                let limit = ScrapeError::PaginationLimitExceeded {
                    limit: self.max_pages,
                };
                warn!("{}", limit);
                outcome.warning = Some(limit);
                break;
            }
            page += 1;
        }

        outcome
    }
}

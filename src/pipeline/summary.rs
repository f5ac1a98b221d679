//! Run accounting.

use std::fmt;

use super::pagination::PaginationOutcome;
use super::records::RecordBatch;
use crate::scrapers::ScrapeError;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every page and every record was retrieved.
    FullSuccess,
    /// Some data was retrieved, but records were skipped, pagination stopped
    /// early, the page ceiling was hit or the run was cancelled.
    Partial {
        skipped: usize,
        stopped_at_page: Option<u32>,
    },
    /// Failures left nothing to write.
    Fatal,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullSuccess => write!(f, "complete"),
            Self::Partial {
                skipped,
                stopped_at_page: Some(page),
            } => write!(
                f,
                "partial ({} skipped, listing stopped at page {})",
                skipped, page
            ),
            Self::Partial { skipped, .. } => write!(f, "partial ({} skipped)", skipped),
            Self::Fatal => write!(f, "failed"),
        }
    }
}

/// Counters and warnings for one or more scraped ranges.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub pages_fetched: u32,
    pub handles_found: usize,
    pub records_extracted: usize,
    /// Detail failures, one per skipped handle.
    pub skipped: Vec<ScrapeError>,
    /// Listing failures and page-ceiling hits.
    pub warnings: Vec<ScrapeError>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn absorb_pagination(&mut self, outcome: &PaginationOutcome) {
        self.pages_fetched += outcome.pages_fetched;
        self.handles_found += outcome.handles.len();
        self.warnings.extend(outcome.warning.iter().cloned());
        self.cancelled |= outcome.cancelled;
    }

    pub fn absorb_batch(&mut self, batch: &RecordBatch) {
        self.records_extracted += batch.records.len();
        self.skipped.extend(batch.skipped.iter().cloned());
        self.cancelled |= batch.cancelled;
    }

    /// Fold another range's summary into this one.
    pub fn merge(&mut self, other: RunSummary) {
        self.pages_fetched += other.pages_fetched;
        self.handles_found += other.handles_found;
        self.records_extracted += other.records_extracted;
        self.skipped.extend(other.skipped);
        self.warnings.extend(other.warnings);
        self.cancelled |= other.cancelled;
    }

    /// First listing page at which pagination stopped on a failure.
    pub fn stopped_at_page(&self) -> Option<u32> {
        self.warnings.iter().find_map(|w| match w {
            ScrapeError::ListingFetchFailed { page, .. } => Some(*page),
            _ => None,
        })
    }

    pub fn hit_page_limit(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ScrapeError::PaginationLimitExceeded { .. }))
    }

    pub fn outcome(&self) -> RunOutcome {
        let stopped_at_page = self.stopped_at_page();
        let failed = !self.skipped.is_empty() || stopped_at_page.is_some();

        if failed && self.records_extracted == 0 {
            return RunOutcome::Fatal;
        }
        if failed || self.cancelled || self.hit_page_limit() {
            return RunOutcome::Partial {
                skipped: self.skipped.len(),
                stopped_at_page,
            };
        }
        RunOutcome::FullSuccess
    }
}

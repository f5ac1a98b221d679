//! Tiered page fetching.
//!
//! A [`PageFetcher`] returns raw markup for a listing page or a detail page.
//! [`TieredFetcher`] tries the configured tiers in priority order, parses the
//! result and falls back to the next tier on transport or structural failure.

mod browser;
mod direct;
mod tiered;

pub use browser::{search_form_fields, BrowserFetcher, SUBMIT_SELECTORS};
pub use direct::{listing_params, DirectFetcher};
pub use tiered::TieredFetcher;

use std::fmt;

use async_trait::async_trait;

use super::error::TransportError;
use crate::models::{DateRange, RecordHandle};

/// Which strategy produced a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTier {
    Direct,
    Browser,
}

impl fmt::Display for FetchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Browser => write!(f, "browser"),
        }
    }
}

/// One fetch strategy.
#[async_trait]
pub trait PageFetcher: Send {
    fn tier(&self) -> FetchTier;

    /// Markup of the zero-based result page `page` for `range`.
    async fn fetch_listing(&mut self, range: &DateRange, page: u32)
        -> Result<String, TransportError>;

    /// Markup of one record's detail page.
    async fn fetch_detail(&mut self, handle: &RecordHandle) -> Result<String, TransportError>;
}

/// Zero-padded search form values: (from yy, mm, dd, to yy, mm, dd).
pub(crate) fn date_fields(range: &DateRange) -> [(&'static str, String); 6] {
    use chrono::Datelike;

    let (start, end) = (range.start(), range.end());
    [
        ("fromyy", start.year().to_string()),
        ("frommm", format!("{:02}", start.month())),
        ("fromdd", format!("{:02}", start.day())),
        ("toyy", end.year().to_string()),
        ("tomm", format!("{:02}", end.month())),
        ("todd", format!("{:02}", end.day())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_fields_are_zero_padded() {
        let range = DateRange::parse("2025-04-01", "2025-12-31").unwrap();
        let fields = date_fields(&range);
        assert_eq!(fields[0], ("fromyy", "2025".to_string()));
        assert_eq!(fields[1], ("frommm", "04".to_string()));
        assert_eq!(fields[2], ("fromdd", "01".to_string()));
        assert_eq!(fields[4], ("tomm", "12".to_string()));
        assert_eq!(fields[5], ("todd", "31".to_string()));
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(FetchTier::Direct.to_string(), "direct");
        assert_eq!(FetchTier::Browser.to_string(), "browser");
    }
}

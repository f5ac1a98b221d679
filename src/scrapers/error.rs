//! Fetch and parse error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Why a fetch ultimately failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Connection, TLS, timeout or non-success HTTP status.
    Network,
    /// The page came back but lacked the expected structure.
    MarkupMismatch,
    /// The browser session could not reach the requested page.
    NavigationFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::MarkupMismatch => "markup-mismatch",
            Self::NavigationFailed => "navigation-failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error from a single transport call on one tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("browser support not available: {0}")]
    Unavailable(String),
}

impl TransportError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Network(_) | Self::Status(_) => FailureReason::Network,
            Self::Navigation(_) | Self::Timeout(_) | Self::Unavailable(_) => {
                FailureReason::NavigationFailed
            }
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => TransportError::Status(status.as_u16()),
            None => TransportError::Network(e.to_string()),
        }
    }
}

/// Structural error from one of the HTML parsers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("listing results container not found")]
    ListingParseFailed,
    #[error("no bid fields found on detail page")]
    DetailParseFailed,
    #[error("listing page {page} repeats the records of the page before it")]
    RepeatedListingPage { page: u32 },
}

/// Failure of a listing or detail operation after all tiers were tried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeError {
    #[error("listing page {page} failed ({reason}): {detail}")]
    ListingFetchFailed {
        page: u32,
        reason: FailureReason,
        detail: String,
    },
    #[error("detail page {url} failed ({reason}): {detail}")]
    DetailFetchFailed {
        url: String,
        reason: FailureReason,
        detail: String,
    },
    #[error("no bid fields found on detail page {url}")]
    DetailParseFailed { url: String },
    #[error("pagination stopped at the {limit}-page ceiling")]
    PaginationLimitExceeded { limit: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_reasons() {
        assert_eq!(
            TransportError::Status(500).reason(),
            FailureReason::Network
        );
        assert_eq!(
            TransportError::Network("reset".into()).reason(),
            FailureReason::Network
        );
        assert_eq!(
            TransportError::Timeout(Duration::from_secs(30)).reason(),
            FailureReason::NavigationFailed
        );
    }

    #[test]
    fn test_listing_failure_message_names_page_and_reason() {
        let err = ScrapeError::ListingFetchFailed {
            page: 3,
            reason: FailureReason::MarkupMismatch,
            detail: "listing results container not found".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("page 3"));
        assert!(msg.contains("markup-mismatch"));
    }
}

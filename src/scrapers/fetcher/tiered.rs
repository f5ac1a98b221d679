//! Tier fallback for listing and detail fetches.

use tracing::{debug, warn};

use super::{FetchTier, PageFetcher};
use crate::models::{BidRecord, DateRange, ListingPage, RecordHandle};
use crate::scrapers::error::{FailureReason, ParseError, ScrapeError, TransportError};
use crate::scrapers::parsing::{DetailParser, ListingParser};
use crate::scrapers::throttle::Throttle;

/// What went wrong on one tier.
#[derive(Debug)]
enum TierFailure {
    Transport(TransportError),
    Parse(ParseError),
}

impl TierFailure {
    fn reason(&self) -> FailureReason {
        match self {
            Self::Transport(e) => e.reason(),
            Self::Parse(_) => FailureReason::MarkupMismatch,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Transport(e) => e.to_string(),
            Self::Parse(e) => e.to_string(),
        }
    }
}

/// Listing progress for the range currently being paged.
#[derive(Debug)]
struct ListingTrail {
    range: DateRange,
    page: u32,
    urls: Vec<String>,
    /// Tiers that served a repeat of the previous page for this range.
    unpaged: Vec<FetchTier>,
}

impl ListingTrail {
    fn start(range: DateRange) -> Self {
        Self {
            range,
            page: 0,
            urls: Vec::new(),
            unpaged: Vec::new(),
        }
    }

    /// `listing` carries the same records as the page just before `page`.
    fn repeats(&self, page: u32, listing: &ListingPage) -> bool {
        page > 0
            && self.page + 1 == page
            && !self.urls.is_empty()
            && listing.records.iter().map(|r| &r.url).eq(self.urls.iter())
    }
}

/// Fetch-and-parse over an ordered list of tiers.
///
/// Each public call consumes exactly one throttle pause, whether it succeeds
/// or fails.
///
/// A tier that answers page N with the records of page N-1 is ignoring the
/// page parameter. That answer counts as a markup mismatch, and the tier is
/// skipped for the rest of the range.
pub struct TieredFetcher {
    tiers: Vec<Box<dyn PageFetcher>>,
    throttle: Box<dyn Throttle>,
    listing_parser: ListingParser,
    detail_parser: DetailParser,
    escalate_incomplete: bool,
    trail: Option<ListingTrail>,
}

impl TieredFetcher {
    pub fn new(
        tiers: Vec<Box<dyn PageFetcher>>,
        throttle: Box<dyn Throttle>,
        listing_parser: ListingParser,
    ) -> Self {
        Self {
            tiers,
            throttle,
            listing_parser,
            detail_parser: DetailParser::new(),
            escalate_incomplete: true,
            trail: None,
        }
    }

    /// Also try later tiers when an earlier one returns an incomplete record.
    pub fn escalate_incomplete(mut self, enabled: bool) -> Self {
        self.escalate_incomplete = enabled;
        self
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Fetch and parse zero-based result page `page`.
    pub async fn fetch_listing(
        &mut self,
        range: &DateRange,
        page: u32,
    ) -> Result<ListingPage, ScrapeError> {
        let trail = match self.trail.take() {
            Some(trail) if page > 0 && trail.range == *range => trail,
            _ => ListingTrail::start(*range),
        };
        let trail = self.trail.insert(trail);
        let mut last: Option<TierFailure> = None;
        let mut parsed = None;

        for tier in self.tiers.iter_mut() {
            if page > 0 && trail.unpaged.contains(&tier.tier()) {
                debug!("Skipping {} tier for listing page {}", tier.tier(), page);
                last = Some(TierFailure::Parse(ParseError::RepeatedListingPage { page }));
                continue;
            }
            let failure = match tier.fetch_listing(range, page).await {
                Ok(markup) => match self.listing_parser.parse(&markup) {
                    Ok(listing) if trail.repeats(page, &listing) => {
                        trail.unpaged.push(tier.tier());
                        TierFailure::Parse(ParseError::RepeatedListingPage { page })
                    }
                    Ok(listing) => {
                        debug!("Listing page {} served by {} tier", page, tier.tier());
                        trail.page = page;
                        trail.urls = listing.records.iter().map(|r| r.url.clone()).collect();
                        parsed = Some(listing);
                        break;
                    }
                    Err(e) => TierFailure::Parse(e),
                },
                Err(e) => TierFailure::Transport(e),
            };
            warn!(
                "Listing page {} failed on {} tier ({}): {}",
                page,
                tier.tier(),
                failure.reason(),
                failure.detail()
            );
            last = Some(failure);
        }

        self.throttle.pause().await;

        parsed.ok_or_else(|| {
            let (reason, detail) = match last {
                Some(f) => (f.reason(), f.detail()),
                None => (FailureReason::Network, "no fetch tiers configured".to_string()),
            };
            ScrapeError::ListingFetchFailed {
                page,
                reason,
                detail,
            }
        })
    }

    /// Fetch and parse one detail page.
    ///
    /// With escalation on, an incomplete record from an earlier tier is
    /// compared against later tiers and the most complete one is kept.
    pub async fn fetch_detail(
        &mut self,
        handle: &RecordHandle,
    ) -> Result<BidRecord, ScrapeError> {
        let mut last: Option<TierFailure> = None;
        let mut best: Option<BidRecord> = None;

        for tier in self.tiers.iter_mut() {
            let failure = match tier.fetch_detail(handle).await {
                Ok(markup) => match self.detail_parser.parse(&markup, &handle.summary) {
                    Ok(record) => {
                        let improves = best
                            .as_ref()
                            .map_or(true, |b| record.populated_count() > b.populated_count());
                        if improves {
                            best = Some(record);
                        }
                        let complete = best
                            .as_ref()
                            .is_some_and(|b| b.missing_fields().is_empty());
                        if complete || !self.escalate_incomplete {
                            break;
                        }
                        debug!(
                            "Record from {} tier is incomplete, trying next tier: {}",
                            tier.tier(),
                            handle.url
                        );
                        continue;
                    }
                    Err(e) => TierFailure::Parse(e),
                },
                Err(e) => TierFailure::Transport(e),
            };
            warn!(
                "Detail {} failed on {} tier ({}): {}",
                handle.url,
                tier.tier(),
                failure.reason(),
                failure.detail()
            );
            last = Some(failure);
        }

        self.throttle.pause().await;

        if let Some(record) = best {
            return Ok(record);
        }
        Err(match last {
            Some(TierFailure::Parse(_)) => ScrapeError::DetailParseFailed {
                url: handle.url.clone(),
            },
            Some(failure) => ScrapeError::DetailFetchFailed {
                url: handle.url.clone(),
                reason: failure.reason(),
                detail: failure.detail(),
            },
            None => ScrapeError::DetailFetchFailed {
                url: handle.url.clone(),
                reason: FailureReason::Network,
                detail: "no fetch tiers configured".to_string(),
            },
        })
    }
}

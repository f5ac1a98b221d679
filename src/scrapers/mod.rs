//! Fetching and parsing of the bid-result site.

pub mod browser;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod parsing;
pub mod throttle;

pub use browser::{BrowserEngineConfig, BrowserSession, ChromiumSession, FormField};
pub use error::{FailureReason, ParseError, ScrapeError, TransportError};
pub use fetcher::{BrowserFetcher, DirectFetcher, FetchTier, PageFetcher, TieredFetcher};
pub use http_client::{DirectRequest, DirectResponse, DirectTransport, HttpClient};
pub use parsing::{DetailParser, ListingParser};
pub use throttle::{NoDelay, RandomDelay, Throttle};

use crate::config::Config;

/// Build the production tier stack: direct HTTP first, then the browser
/// unless it is disabled.
pub fn build_fetcher(config: &Config) -> Result<TieredFetcher, TransportError> {
    let client = HttpClient::new(&config.http, &config.site.charset)?;
    let mut tiers: Vec<Box<dyn PageFetcher>> =
        vec![Box::new(DirectFetcher::new(client, config.site.clone()))];

    if config.browser.enabled {
        let session = ChromiumSession::new(config.browser.clone());
        tiers.push(Box::new(BrowserFetcher::new(
            Box::new(session),
            config.site.clone(),
            config.browser.fetch_ceiling(),
        )));
    }

    Ok(TieredFetcher::new(
        tiers,
        Box::new(RandomDelay::from_config(&config.throttle)),
        ListingParser::from_site(&config.site),
    )
    .escalate_incomplete(config.detail.escalate_incomplete))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_fetcher_respects_browser_toggle() {
        let mut config = Config::default();
        assert_eq!(build_fetcher(&config).unwrap().tier_count(), 2);

        config.browser.enabled = false;
        assert_eq!(build_fetcher(&config).unwrap().tier_count(), 1);
    }
}

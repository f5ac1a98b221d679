//! Browser tier: drives the search form like a user would.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{date_fields, FetchTier, PageFetcher};
use crate::config::SiteConfig;
use crate::models::{DateRange, RecordHandle};
use crate::scrapers::browser::{BrowserSession, FormField};
use crate::scrapers::error::TransportError;
use crate::scrapers::parsing::NEXT_PAGE_LABELS;

/// Search button selectors, most specific first.
pub const SUBMIT_SELECTORS: &[&str] = &[
    "input[type=submit][value='検索実行']",
    "input[type=submit]",
    "button[type=submit]",
];

/// Date selects plus every bid-type checkbox ticked.
pub fn search_form_fields(site: &SiteConfig, range: &DateRange) -> Vec<FormField> {
    let mut fields: Vec<FormField> = date_fields(range)
        .into_iter()
        .map(|(name, value)| FormField::select(name, value))
        .collect();
    fields.extend(
        site.bid_types
            .iter()
            .map(|(name, _)| FormField::checkbox(name.clone(), true)),
    );
    fields
}

/// Listing and detail fetches through a [`BrowserSession`].
///
/// The session remembers which result page it is showing, so walking the
/// listing forward costs one click per page.
pub struct BrowserFetcher {
    session: Box<dyn BrowserSession>,
    site: SiteConfig,
    fetch_ceiling: Duration,
    position: Option<(DateRange, u32)>,
}

impl BrowserFetcher {
    pub fn new(
        session: Box<dyn BrowserSession>,
        site: SiteConfig,
        fetch_ceiling: Duration,
    ) -> Self {
        Self {
            session,
            site,
            fetch_ceiling,
            position: None,
        }
    }

    async fn open_listing(
        &mut self,
        range: &DateRange,
        page: u32,
    ) -> Result<String, TransportError> {
        let clicks = match self.position {
            Some((current, at)) if current == *range && at <= page => page - at,
            _ => {
                self.position = None;
                self.submit_search(range).await?;
                self.position = Some((*range, 0));
                page
            }
        };

        for _ in 0..clicks {
            if !self.session.follow_link(NEXT_PAGE_LABELS).await? {
                return Err(TransportError::Navigation(format!(
                    "no next-page link while seeking page {}",
                    page
                )));
            }
            if let Some((_, ref mut at)) = self.position {
                *at += 1;
            }
        }

        self.session.rendered_markup().await
    }

    async fn submit_search(&mut self, range: &DateRange) -> Result<(), TransportError> {
        debug!("Submitting search form for {}", range);
        self.session.navigate(&self.site.search_url()).await?;
        self.session
            .fill_form(&search_form_fields(&self.site, range))
            .await?;
        self.session.submit(SUBMIT_SELECTORS).await
    }

    async fn open_detail(&mut self, url: &str) -> Result<String, TransportError> {
        self.session.navigate(url).await?;
        self.session.rendered_markup().await
    }

    /// Tear the session down after the whole-fetch ceiling was hit.
    async fn abandon(&mut self, what: &str) -> TransportError {
        warn!(
            "Browser fetch of {} exceeded {:?}; resetting session",
            what, self.fetch_ceiling
        );
        self.position = None;
        self.session.reset().await;
        TransportError::Timeout(self.fetch_ceiling)
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn tier(&self) -> FetchTier {
        FetchTier::Browser
    }

    async fn fetch_listing(
        &mut self,
        range: &DateRange,
        page: u32,
    ) -> Result<String, TransportError> {
        let ceiling = self.fetch_ceiling;
        match tokio::time::timeout(ceiling, self.open_listing(range, page)).await {
            Ok(Ok(markup)) => Ok(markup),
            Ok(Err(e)) => {
                self.position = None;
                Err(e)
            }
            Err(_) => Err(self.abandon(&format!("listing page {}", page)).await),
        }
    }

    async fn fetch_detail(&mut self, handle: &RecordHandle) -> Result<String, TransportError> {
        // Leaving the results page invalidates the pagination position.
        self.position = None;
        let ceiling = self.fetch_ceiling;
        match tokio::time::timeout(ceiling, self.open_detail(&handle.url)).await {
            Ok(result) => result,
            Err(_) => Err(self.abandon(&handle.url).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Session that logs calls and serves a page number as markup.
    #[derive(Clone, Default)]
    struct ScriptedSession {
        calls: Arc<Mutex<Vec<String>>>,
        page: Arc<Mutex<u32>>,
        last_page: u32,
        hang: bool,
    }

    impl ScriptedSession {
        fn log(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn navigate(&mut self, url: &str) -> Result<(), TransportError> {
            self.log(format!("navigate {}", url));
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }

        async fn fill_form(&mut self, fields: &[FormField]) -> Result<(), TransportError> {
            self.log(format!("fill {}", fields.len()));
            Ok(())
        }

        async fn submit(&mut self, _selectors: &[&str]) -> Result<(), TransportError> {
            self.log("submit");
            *self.page.lock().unwrap() = 0;
            Ok(())
        }

        async fn follow_link(&mut self, _texts: &[&str]) -> Result<bool, TransportError> {
            self.log("next");
            let mut page = self.page.lock().unwrap();
            if *page >= self.last_page {
                return Ok(false);
            }
            *page += 1;
            Ok(true)
        }

        async fn rendered_markup(&mut self) -> Result<String, TransportError> {
            Ok(format!("page {}", self.page.lock().unwrap()))
        }

        async fn reset(&mut self) {
            self.log("reset");
        }
    }

    fn range() -> DateRange {
        DateRange::parse("2025-04-01", "2025-04-30").unwrap()
    }

    fn fetcher(session: &ScriptedSession) -> BrowserFetcher {
        BrowserFetcher::new(
            Box::new(session.clone()),
            SiteConfig::default(),
            Duration::from_secs(90),
        )
    }

    #[test]
    fn test_form_fields_tick_every_bid_type() {
        let fields = search_form_fields(&SiteConfig::default(), &range());
        assert_eq!(fields.len(), 9);
        assert_eq!(fields[0], FormField::select("fromyy", "2025"));
        assert_eq!(fields[8], FormField::checkbox("nyusatsu3", true));
    }

    #[tokio::test]
    async fn test_sequential_pages_cost_one_click_each() {
        let session = ScriptedSession {
            last_page: 5,
            ..Default::default()
        };
        let mut fetcher = fetcher(&session);

        assert_eq!(fetcher.fetch_listing(&range(), 0).await.unwrap(), "page 0");
        assert_eq!(fetcher.fetch_listing(&range(), 1).await.unwrap(), "page 1");
        assert_eq!(fetcher.fetch_listing(&range(), 2).await.unwrap(), "page 2");

        let calls = session.calls();
        assert_eq!(calls.iter().filter(|c| *c == "submit").count(), 1);
        assert_eq!(calls.iter().filter(|c| *c == "next").count(), 2);
        assert_eq!(calls[1], "fill 9");
    }

    #[tokio::test]
    async fn test_cold_start_clicks_through_to_page() {
        let session = ScriptedSession {
            last_page: 5,
            ..Default::default()
        };
        let mut fetcher = fetcher(&session);

        assert_eq!(fetcher.fetch_listing(&range(), 3).await.unwrap(), "page 3");
        assert_eq!(session.calls().iter().filter(|c| *c == "next").count(), 3);
    }

    #[tokio::test]
    async fn test_detail_fetch_forces_resubmit() {
        let session = ScriptedSession {
            last_page: 5,
            ..Default::default()
        };
        let mut fetcher = fetcher(&session);

        fetcher.fetch_listing(&range(), 0).await.unwrap();
        fetcher
            .fetch_detail(&RecordHandle::new("https://example.com/resultk.php?id=1"))
            .await
            .unwrap();
        fetcher.fetch_listing(&range(), 1).await.unwrap();

        assert_eq!(session.calls().iter().filter(|c| *c == "submit").count(), 2);
    }

    #[tokio::test]
    async fn test_missing_next_link_is_navigation_failure() {
        let session = ScriptedSession {
            last_page: 0,
            ..Default::default()
        };
        let mut fetcher = fetcher(&session);

        let err = fetcher.fetch_listing(&range(), 1).await.unwrap_err();
        assert!(matches!(err, TransportError::Navigation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_resets_session() {
        let session = ScriptedSession {
            hang: true,
            ..Default::default()
        };
        let mut fetcher = fetcher(&session);

        let err = fetcher.fetch_listing(&range(), 0).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_secs(90)));
        assert_eq!(session.calls().last().map(String::as_str), Some("reset"));
    }
}

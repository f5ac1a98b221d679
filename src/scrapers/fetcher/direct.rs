//! Direct HTTP tier.

use async_trait::async_trait;
use tracing::debug;

use super::{date_fields, FetchTier, PageFetcher};
use crate::config::SiteConfig;
use crate::models::{DateRange, RecordHandle};
use crate::scrapers::error::TransportError;
use crate::scrapers::http_client::{DirectRequest, DirectResponse, DirectTransport};

/// Free-text search fields sent empty.
const EMPTY_FIELDS: &[&str] = &["koujimei", "fromkin", "tokin", "anken"];

/// Form parameters for one results page. Page 0 carries no page parameter;
/// later pages send the 1-based page number.
pub fn listing_params(site: &SiteConfig, range: &DateRange, page: u32) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = date_fields(range)
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    params.extend(EMPTY_FIELDS.iter().map(|k| (k.to_string(), String::new())));
    params.extend(site.bid_types.iter().cloned());
    if page > 0 {
        params.push((site.page_param.clone(), (page + 1).to_string()));
    }
    params
}

/// Form POST against the results endpoint over a [`DirectTransport`].
pub struct DirectFetcher<T> {
    transport: T,
    site: SiteConfig,
    warmed: bool,
}

impl<T: DirectTransport> DirectFetcher<T> {
    pub fn new(transport: T, site: SiteConfig) -> Self {
        Self {
            transport,
            site,
            warmed: false,
        }
    }

    /// Load the search form once so the server issues its session cookie.
    async fn warm_up(&mut self) -> Result<(), TransportError> {
        if self.warmed {
            return Ok(());
        }
        let response = self
            .transport
            .send(&DirectRequest::get(self.site.search_url()))
            .await?;
        check_status(&response)?;
        debug!("Session warmed via {}", response.final_url);
        self.warmed = true;
        Ok(())
    }
}

fn check_status(response: &DirectResponse) -> Result<(), TransportError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status(response.status))
    }
}

#[async_trait]
impl<T: DirectTransport> PageFetcher for DirectFetcher<T> {
    fn tier(&self) -> FetchTier {
        FetchTier::Direct
    }

    async fn fetch_listing(
        &mut self,
        range: &DateRange,
        page: u32,
    ) -> Result<String, TransportError> {
        self.warm_up().await?;

        let request = DirectRequest::post(
            self.site.results_url(),
            listing_params(&self.site, range, page),
        )
        .with_referer(self.site.search_url());

        let response = self.transport.send(&request).await?;
        check_status(&response)?;
        Ok(response.body)
    }

    async fn fetch_detail(&mut self, handle: &RecordHandle) -> Result<String, TransportError> {
        let request = DirectRequest::get(handle.url.clone()).with_referer(self.site.results_url());
        let response = self.transport.send(&request).await?;
        check_status(&response)?;
        Ok(response.body)
    }
}

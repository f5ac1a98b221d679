//! Direct HTTP transport.
//!
//! The lightweight fetch tier talks to the site through [`DirectTransport`];
//! [`HttpClient`] is the reqwest-backed implementation used in production.

mod response;
mod user_agent;

pub use response::{DirectRequest, DirectResponse, Method};
pub use user_agent::{resolve_user_agent, IMPERSONATE_USER_AGENTS, USER_AGENT};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::TransportError;
use crate::config::HttpConfig;

/// Status + body transport for plain HTTP requests.
#[async_trait]
pub trait DirectTransport: Send + Sync {
    async fn send(&self, request: &DirectRequest) -> Result<DirectResponse, TransportError>;
}

/// reqwest-backed transport with a cookie store and charset fallback.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    default_charset: String,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(config: &HttpConfig, default_charset: &str) -> Result<Self, TransportError> {
        Self::with_timeout(
            config.timeout(),
            config.user_agent.as_deref(),
            default_charset,
        )
    }

    /// Create a client with an explicit timeout and user agent configuration.
    pub fn with_timeout(
        timeout: Duration,
        user_agent_config: Option<&str>,
        default_charset: &str,
    ) -> Result<Self, TransportError> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            default_charset: default_charset.to_string(),
        })
    }
}

#[async_trait]
impl DirectTransport for HttpClient {
    async fn send(&self, request: &DirectRequest) -> Result<DirectResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url).query(&request.params),
            Method::Post => self.client.post(&request.url).form(&request.params),
        };
        if let Some(ref referer) = request.referer {
            builder = builder.header(reqwest::header::REFERER, referer);
        }

        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        // Declared charset wins; the site default covers undeclared CP932 pages.
        let body = response.text_with_charset(&self.default_charset).await?;

        debug!(
            "{:?} {} -> {} ({} bytes, {:?})",
            request.method,
            request.url,
            status,
            body.len(),
            start.elapsed()
        );

        Ok(DirectResponse {
            status,
            final_url,
            body,
        })
    }
}

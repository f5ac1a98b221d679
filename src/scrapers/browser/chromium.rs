//! chromiumoxide-backed [`BrowserSession`].

use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::BrowserEngineConfig;
use super::{BrowserSession, FormField};
use crate::scrapers::error::TransportError;

/// User agent presented by the browser tier.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Sets each control and returns the names that could not be set.
const FILL_FORM_SCRIPT: &str = r#"
    ((fields) => {
        const failed = [];
        for (const f of fields) {
            const el = document.getElementsByName(f.name)[0];
            if (!el) { failed.push(f.name); continue; }
            if (f.kind === 'select') {
                el.value = f.value;
                if (el.value !== f.value) { failed.push(f.name); continue; }
            } else if (el.checked !== f.checked) {
                el.checked = f.checked;
            }
            el.dispatchEvent(new Event('change', { bubbles: true }));
        }
        return failed;
    })(__FIELDS__)
"#;

/// Clicks the first element matching a selector; returns the selector used.
const SUBMIT_SCRIPT: &str = r#"
    ((selectors) => {
        for (const sel of selectors) {
            const el = document.querySelector(sel);
            if (el) { el.click(); return sel; }
        }
        return null;
    })(__SELECTORS__)
"#;

/// Clicks the first enabled anchor whose text equals one of the labels, or
/// starts with a multi-character label.
const FOLLOW_LINK_SCRIPT: &str = r#"
    ((labels) => {
        const matches = (t) => labels.some((l) => t === l || (l.length > 1 && t.startsWith(l)));
        for (const a of document.querySelectorAll('a')) {
            const t = (a.textContent || '').trim();
            if (!matches(t)) continue;
            if (a.classList.contains('disabled')) continue;
            if (a.getAttribute('aria-disabled') === 'true') continue;
            if (!a.getAttribute('href') && !a.getAttribute('onclick')) continue;
            a.click();
            return true;
        }
        return false;
    })(__LABELS__)
"#;

/// One Chrome page driven over CDP.
pub struct ChromiumSession {
    config: BrowserEngineConfig,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

impl ChromiumSession {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
            handler: None,
        }
    }

    /// Find Chrome executable.
    fn find_chrome() -> Result<PathBuf, TransportError> {
        for path in CHROME_PATHS {
            let p = Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        info!("Found Chrome in PATH: {}", path);
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(TransportError::Unavailable(
            "Chrome/Chromium not found; install it or set browser.remote_url".to_string(),
        ))
    }

    /// Launch or connect to browser if not already running.
    async fn ensure_browser(&mut self) -> Result<(), TransportError> {
        if self.browser.is_some() {
            return Ok(());
        }

        if let Some(remote_url) = self.config.remote_url.clone() {
            return self.connect_remote(&remote_url).await;
        }

        info!("Launching browser (headless={})", self.config.headless);
        let chrome_path = Self::find_chrome()?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(self.config.timeout());

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--lang=ja-JP");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| TransportError::Navigation(format!("invalid browser config: {}", e)))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| TransportError::Navigation(format!("failed to launch browser: {}", e)))?;

        self.install(browser, handler);
        Ok(())
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(&mut self, url: &str) -> Result<(), TransportError> {
        info!("Connecting to remote browser at {}", url);

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .timeout(self.config.timeout())
            .send()
            .await?
            .json()
            .await?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                TransportError::Navigation("no webSocketDebuggerUrl in response".to_string())
            })?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: self.config.timeout(),
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| {
                TransportError::Navigation(format!("failed to connect to remote browser: {}", e))
            })?;

        self.install(browser, handler);
        Ok(())
    }

    fn install(&mut self, browser: Browser, mut handler: chromiumoxide::Handler) {
        self.handler = Some(tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        }));
        self.browser = Some(browser);
    }

    /// The current page, opening one if needed.
    async fn ensure_page(&mut self) -> Result<&Page, TransportError> {
        if self.page.is_none() {
            self.ensure_browser().await?;
            let timeout = self.config.timeout();
            let browser = self
                .browser
                .as_ref()
                .ok_or_else(|| TransportError::Navigation("browser not initialized".to_string()))?;

            let page = bounded(timeout, "open page", browser.new_page("about:blank")).await?;
            bounded(
                timeout,
                "set user agent",
                page.execute(SetUserAgentOverrideParams::new(
                    BROWSER_USER_AGENT.to_string(),
                )),
            )
            .await?;
            self.page = Some(page);
        }

        self.page
            .as_ref()
            .ok_or_else(|| TransportError::Navigation("page not initialized".to_string()))
    }

    /// Handle to the current page; cheap to clone.
    fn current_page(&self) -> Result<Page, TransportError> {
        self.page
            .clone()
            .ok_or_else(|| TransportError::Navigation("no page loaded".to_string()))
    }
}

/// Evaluate a script and decode its JSON result.
async fn evaluate<T>(
    page: &Page,
    timeout: Duration,
    what: &str,
    script: String,
) -> Result<T, TransportError>
where
    T: serde::de::DeserializeOwned,
{
    let result = bounded(timeout, what, page.evaluate(script)).await?;
    result
        .into_value()
        .map_err(|e| TransportError::Navigation(format!("{}: unexpected result: {}", what, e)))
}

/// Wait for the navigation started by a click, then for the DOM.
async fn settle(page: &Page, timeout: Duration) -> Result<(), TransportError> {
    bounded(timeout, "wait for navigation", page.wait_for_navigation()).await?;
    wait_for_page_ready(page, timeout).await;
    Ok(())
}

/// Run a CDP call under the operation timeout.
async fn bounded<T, E, F>(timeout: Duration, what: &str, fut: F) -> Result<T, TransportError>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TransportError::Navigation(format!("{}: {}", what, e))),
        Err(_) => {
            warn!("Browser operation '{}' timed out after {:?}", what, timeout);
            Err(TransportError::Timeout(timeout))
        }
    }
}

/// Wait for the page to reach a ready state.
async fn wait_for_page_ready(page: &Page, timeout: Duration) {
    match tokio::time::timeout(timeout, page.evaluate(WAIT_FOR_READY_SCRIPT.to_string())).await {
        Ok(Ok(result)) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!("Page ready state: {}", state);
        }
        Ok(Err(e)) => debug!("Could not check ready state: {}", e),
        Err(_) => warn!("Timeout waiting for page ready state"),
    }
}

fn inject(
    template: &str,
    placeholder: &str,
    value: &impl serde::Serialize,
) -> Result<String, TransportError> {
    let json = serde_json::to_string(value)
        .map_err(|e| TransportError::Navigation(format!("failed to encode script input: {}", e)))?;
    Ok(template.replace(placeholder, &json))
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), TransportError> {
        let timeout = self.config.timeout();
        let page = self.ensure_page().await?.clone();

        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| TransportError::Navigation(format!("invalid URL {}: {}", url, e)))?;

        bounded(timeout, "navigate", page.execute(nav_params)).await?;
        settle(&page, timeout).await
    }

    async fn fill_form(&mut self, fields: &[FormField]) -> Result<(), TransportError> {
        let page = self.current_page()?;
        let script = inject(FILL_FORM_SCRIPT, "__FIELDS__", &fields)?;
        let failed: Vec<String> =
            evaluate(&page, self.config.timeout(), "fill form", script).await?;
        if !failed.is_empty() {
            return Err(TransportError::Navigation(format!(
                "form controls not set: {}",
                failed.join(", ")
            )));
        }
        debug!("Filled {} form controls", fields.len());
        Ok(())
    }

    async fn submit(&mut self, selectors: &[&str]) -> Result<(), TransportError> {
        let page = self.current_page()?;
        let timeout = self.config.timeout();
        let script = inject(SUBMIT_SCRIPT, "__SELECTORS__", &selectors)?;
        let clicked: Option<String> = evaluate(&page, timeout, "submit", script).await?;
        match clicked {
            Some(selector) => {
                debug!("Submitted via {}", selector);
                settle(&page, timeout).await
            }
            None => Err(TransportError::Navigation(
                "no submit control found".to_string(),
            )),
        }
    }

    async fn follow_link(&mut self, texts: &[&str]) -> Result<bool, TransportError> {
        let page = self.current_page()?;
        let timeout = self.config.timeout();
        let script = inject(FOLLOW_LINK_SCRIPT, "__LABELS__", &texts)?;
        let clicked: bool = evaluate(&page, timeout, "follow link", script).await?;
        if clicked {
            settle(&page, timeout).await?;
        }
        Ok(clicked)
    }

    async fn rendered_markup(&mut self) -> Result<String, TransportError> {
        let page = self.current_page()?;
        let timeout = self.config.timeout();
        bounded(timeout, "read content", page.content()).await
    }

    async fn reset(&mut self) {
        let grace = Duration::from_secs(5);
        if let Some(page) = self.page.take() {
            let _ = tokio::time::timeout(grace, page.close()).await;
        }
        if let Some(mut browser) = self.browser.take() {
            // A remote browser is shared; only drop the connection.
            if self.config.remote_url.is_none() {
                let _ = tokio::time::timeout(grace, browser.close()).await;
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        debug!("Browser session reset");
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

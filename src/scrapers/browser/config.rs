//! Browser tier configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Browser tier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Use the browser tier at all. When false only the direct tier runs.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Run in headless mode (default: true).
    /// Set to false to watch the form being driven.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Upper bound for any single browser operation, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Upper bound for a whole listing or detail fetch on this tier.
    /// The session is torn down when it is hit.
    #[serde(default = "default_fetch_ceiling")]
    pub fetch_ceiling_secs: u64,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,
}

pub fn default_enabled() -> bool {
    true
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    30
}

pub fn default_fetch_ceiling() -> u64 {
    90
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            headless: default_headless(),
            timeout_secs: default_timeout(),
            fetch_ceiling_secs: default_fetch_ceiling(),
            proxy: None,
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

impl BrowserEngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn fetch_ceiling(&self) -> Duration {
        Duration::from_secs(self.fetch_ceiling_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrowserEngineConfig::default();
        assert!(config.enabled);
        assert!(config.headless);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.fetch_ceiling(), Duration::from_secs(90));
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config: BrowserEngineConfig =
            toml::from_str("headless = false\nremote_url = \"ws://localhost:9222\"\n").unwrap();
        assert!(config.enabled);
        assert!(!config.headless);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.remote_url.as_deref(), Some("ws://localhost:9222"));
    }
}

//! Configuration for kobe-bids.
//!
//! Everything has a default, so the config file is optional. Values are read
//! from `kobe-bids.toml` in the working directory (or an explicit path) and
//! then overridden by CLI flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scrapers::browser::BrowserEngineConfig;

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "kobe-bids.toml";

/// Errors from loading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub throttle: ThrottleConfig,
    pub pagination: PaginationConfig,
    pub detail: DetailConfig,
    pub browser: BrowserEngineConfig,
    pub sheets: SheetsConfig,
}

impl Config {
    /// Load from an explicit path, or from `kobe-bids.toml` if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE_NAME);
                if !default.exists() {
                    tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate config text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.throttle.min_secs < 0.0 || self.throttle.max_secs < self.throttle.min_secs {
            return Err(ConfigError::Invalid(format!(
                "throttle range [{}, {}] is not a valid interval",
                self.throttle.min_secs, self.throttle.max_secs
            )));
        }
        if self.pagination.max_pages == 0 {
            return Err(ConfigError::Invalid(
                "pagination.max_pages must be at least 1".to_string(),
            ));
        }
        url::Url::parse(&self.site.base_url)
            .map_err(|e| ConfigError::Invalid(format!("site.base_url: {}", e)))?;
        Ok(())
    }
}

/// Target site layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site root; relative record links are resolved against it.
    pub base_url: String,
    /// Search form page.
    pub search_path: String,
    /// Search results endpoint (form POST target).
    pub results_path: String,
    /// Form parameter carrying the 1-based page number on the direct tier.
    pub page_param: String,
    /// Charset used when the server does not declare one.
    pub charset: String,
    /// Bid-type checkboxes, as (form field name, value) pairs.
    pub bid_types: Vec<(String, String)>,
    /// Text shown instead of a results table when nothing matched.
    pub no_results_markers: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nyusatsukekka.city.kobe.lg.jp/".to_string(),
            search_path: "searchk.php".to_string(),
            results_path: "resultsk.php".to_string(),
            page_param: "page".to_string(),
            charset: "shift_jis".to_string(),
            bid_types: vec![
                ("nyusatsu1".to_string(), "一般競争入札".to_string()),
                ("nyusatsu2".to_string(), "指名競争入札".to_string()),
                ("nyusatsu3".to_string(), "制限付一般競争入札".to_string()),
            ],
            no_results_markers: vec![
                "該当するデータはありません".to_string(),
                "該当データなし".to_string(),
                "検索結果は0件".to_string(),
            ],
        }
    }
}

impl SiteConfig {
    /// Resolve a site-relative path to an absolute URL.
    pub fn url_for(&self, path: &str) -> String {
        resolve_url(&self.base_url, path)
    }

    pub fn search_url(&self) -> String {
        self.url_for(&self.search_path)
    }

    pub fn results_url(&self) -> String {
        self.url_for(&self.results_path)
    }
}

/// Resolve a path or URL against a base, handling absolute URLs.
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    match url::Url::parse(base_url).and_then(|base| base.join(path)) {
        Ok(u) => u.to_string(),
        Err(_) => format!("{}{}", base_url, path),
    }
}

/// Direct HTTP tier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent configuration.
    /// - None: default kobe-bids user agent
    /// - "impersonate": a real browser user agent
    /// - Any other string: used as-is
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: Some("impersonate".to_string()),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Randomized delay applied after every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_secs: 1.0,
            max_secs: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Hard ceiling on listing pages fetched per range.
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_pages: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailConfig {
    /// Retry on the next tier when the first tier's record has missing fields.
    pub escalate_incomplete: bool,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            escalate_incomplete: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Worksheet (tab) name, for Google Sheets and XLSX output.
    pub sheet_name: String,
    /// Sheets API root, overridable for proxies.
    pub api_base: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            api_base: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.throttle.min_secs, 1.0);
        assert_eq!(config.throttle.max_secs, 3.0);
        assert!(config.detail.escalate_incomplete);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
            [throttle]
            min_secs = 0.5
            max_secs = 0.5

            [pagination]
            max_pages = 5

            [browser]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.throttle.max_secs, 0.5);
        assert_eq!(config.pagination.max_pages, 5);
        assert!(!config.browser.enabled);
        assert_eq!(config.site, SiteConfig::default());
    }

    #[test]
    fn test_rejects_inverted_throttle() {
        let err = Config::from_toml("[throttle]\nmin_secs = 3.0\nmax_secs = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_page_ceiling() {
        let err = Config::from_toml("[pagination]\nmax_pages = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_site_urls() {
        let site = SiteConfig::default();
        assert_eq!(
            site.search_url(),
            "https://nyusatsukekka.city.kobe.lg.jp/searchk.php"
        );
        assert_eq!(
            site.url_for("resultk.php?id=12"),
            "https://nyusatsukekka.city.kobe.lg.jp/resultk.php?id=12"
        );
        assert_eq!(
            site.url_for("https://example.com/x"),
            "https://example.com/x"
        );
    }
}

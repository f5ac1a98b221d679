//! Browser-driven fetch tier.
//!
//! The search site is a plain form, so the browser tier only needs a handful
//! of operations: load a page, set form controls, submit, click a pagination
//! link and read back the rendered DOM. [`BrowserSession`] is that surface;
//! [`ChromiumSession`] implements it with chromiumoxide (CDP) when the
//! `browser` feature is enabled.

mod config;
#[cfg(feature = "browser")]
mod chromium;

pub use config::BrowserEngineConfig;
#[cfg(feature = "browser")]
pub use chromium::ChromiumSession;

use async_trait::async_trait;
use serde::Serialize;

use super::error::TransportError;

/// One form control to set before submitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormField {
    /// `<select name=..>` set to the option with this value.
    Select { name: String, value: String },
    /// `<input type=checkbox name=..>` forced to the given state.
    Checkbox { name: String, checked: bool },
}

impl FormField {
    pub fn select(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Select {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
        Self::Checkbox {
            name: name.into(),
            checked,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Select { name, .. } | Self::Checkbox { name, .. } => name,
        }
    }
}

/// A stateful browser page.
///
/// Operations apply to the single current page. Implementations bound each
/// call by their own operation timeout.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url`, starting the browser on first use.
    async fn navigate(&mut self, url: &str) -> Result<(), TransportError>;

    /// Set form controls on the current page. Fails if any control is missing.
    async fn fill_form(&mut self, fields: &[FormField]) -> Result<(), TransportError>;

    /// Click the first element matching one of `selectors` (tried in order)
    /// and wait for the resulting navigation.
    async fn submit(&mut self, selectors: &[&str]) -> Result<(), TransportError>;

    /// Click the first enabled link whose text matches one of `texts`.
    ///
    /// Returns `false` if no such link exists.
    async fn follow_link(&mut self, texts: &[&str]) -> Result<bool, TransportError>;

    /// Serialized DOM of the current page.
    async fn rendered_markup(&mut self) -> Result<String, TransportError>;

    /// Drop the page and browser; the next call starts fresh.
    async fn reset(&mut self);
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct ChromiumSession {
    #[allow(dead_code)]
    config: BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl ChromiumSession {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    fn unavailable() -> TransportError {
        TransportError::Unavailable(
            "rebuild with: cargo build --features browser".to_string(),
        )
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, _url: &str) -> Result<(), TransportError> {
        Err(Self::unavailable())
    }

    async fn fill_form(&mut self, _fields: &[FormField]) -> Result<(), TransportError> {
        Err(Self::unavailable())
    }

    async fn submit(&mut self, _selectors: &[&str]) -> Result<(), TransportError> {
        Err(Self::unavailable())
    }

    async fn follow_link(&mut self, _texts: &[&str]) -> Result<bool, TransportError> {
        Err(Self::unavailable())
    }

    async fn rendered_markup(&mut self) -> Result<String, TransportError> {
        Err(Self::unavailable())
    }

    async fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_field_serializes_with_kind_tag() {
        let json = serde_json::to_value(vec![
            FormField::select("fromyy", "2025"),
            FormField::checkbox("nyusatsu1", true),
        ])
        .unwrap();

        assert_eq!(json[0]["kind"], "select");
        assert_eq!(json[0]["name"], "fromyy");
        assert_eq!(json[0]["value"], "2025");
        assert_eq!(json[1]["kind"], "checkbox");
        assert_eq!(json[1]["checked"], true);
    }

    #[test]
    fn test_form_field_name() {
        assert_eq!(FormField::checkbox("nyusatsu2", false).name(), "nyusatsu2");
    }
}

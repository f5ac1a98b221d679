//! Direct-transport request and response types.

/// HTTP method used by the direct tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One request on the direct tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectRequest {
    pub method: Method,
    pub url: String,
    /// Form-encoded parameters (POST body, or query string for GET).
    pub params: Vec<(String, String)>,
    pub referer: Option<String>,
}

impl DirectRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            params: Vec::new(),
            referer: None,
        }
    }

    pub fn post(url: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            params,
            referer: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Value of a form parameter, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and decoded body of a direct response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectResponse {
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

impl DirectResponse {
    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

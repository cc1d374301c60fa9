use std::collections::BTreeMap;
use std::time::Duration;

use crate::client::token::AccessToken;

pub const API_PREFIX: &str = "/ox/4.0/";
pub const ACCESS_TOKEN_COOKIE: &str = "openx3_access_token";
pub const CLIENT_HEADER: &str = "X-OpenX-Client";
pub const CLIENT_ID: &str = "ox_api_cli v0.1";

/// Optional parts of an authenticated API request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub json: Option<serde_json::Value>,
    pub form: Vec<(String, String)>,
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.json = Some(value);
        self
    }

    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Render `cookies` as a single `Cookie` header value.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        Some(pairs.join("; "))
    }
}

/// Resolve a path or URL against the API host.
///
/// Paths already carrying the API version prefix only gain the host, other
/// absolute paths are placed under the prefix, and anything else is returned
/// unchanged.
pub fn prefix_url(api_hostname: &str, url: &str) -> String {
    if url.starts_with(API_PREFIX) {
        format!("https://{api_hostname}{url}")
    } else if let Some(rest) = url.strip_prefix('/') {
        format!("https://{api_hostname}{API_PREFIX}{rest}")
    } else {
        url.to_string()
    }
}

/// Rewrite the URL and attach the access-token cookie and client header.
pub fn prepare_request(
    api_hostname: &str,
    url: &str,
    mut options: RequestOptions,
    token: &AccessToken,
) -> (String, RequestOptions) {
    options
        .cookies
        .insert(ACCESS_TOKEN_COOKIE.to_string(), token.oauth_token.clone());
    options
        .headers
        .insert(CLIENT_HEADER.to_string(), CLIENT_ID.to_string());
    (prefix_url(api_hostname, url), options)
}

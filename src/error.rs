use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum OxApiError {
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Not authenticated. Run: oxapi login")]
    NotAuthenticated,

    #[error("Cannot start local callback listener: {0}")]
    ListenerFailure(#[source] std::io::Error),

    #[error("Cannot access cache file {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl OxApiError {
    /// Error code string for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            OxApiError::AuthFailure(_) => "auth_failure",
            OxApiError::NotAuthenticated => "not_authenticated",
            OxApiError::ListenerFailure(_) => "listener_failure",
            OxApiError::CacheIo { .. } => "cache_io",
            OxApiError::Http(_) => "http_error",
            OxApiError::ConfigError(_) => "config_error",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "message": self.to_string(),
                "code": self.code(),
            }
        })
    }
}

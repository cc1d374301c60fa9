pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;

pub use cache::{CacheStore, CustomerCredsCache, StringFileCache, TokenCache};
pub use client::{AccessToken, AuthData, BrowserLogin, OxApiClient, RequestOptions};
pub use config::ClientConfig;
pub use error::OxApiError;

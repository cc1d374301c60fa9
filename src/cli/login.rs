use std::path::Path;
use std::time::Duration;

use crate::cache::{lock_cache, CacheStore};
use crate::client::BrowserLogin;
use crate::config::ClientConfig;
use crate::error::OxApiError;

/// Customer settings from the cache, overridden by anything given explicitly.
pub fn resolve_config(
    store: &CacheStore,
    cache_dir: Option<&Path>,
    overrides: ClientConfig,
) -> Result<ClientConfig, OxApiError> {
    let cached = lock_cache(&store.customer_cache(cache_dir)).get()?;
    Ok(overrides.merge(ClientConfig::from_cached(cached)))
}

/// Run the login command.
pub async fn run_login(
    store: &CacheStore,
    cache_dir: Option<&Path>,
    overrides: ClientConfig,
    username: Option<&str>,
    password: Option<&str>,
    timeout: Duration,
) -> Result<(), OxApiError> {
    let config = resolve_config(store, cache_dir, overrides)?;
    let mut client = config
        .build_client()?
        .with_token_cache(store.token_cache(cache_dir));

    match (username, password) {
        (Some(_), Some(_)) => client.login(username, password).await?,
        (Some(_), None) | (None, Some(_)) => {
            return Err(OxApiError::ConfigError(
                "--username and --password must be given together".into(),
            ))
        }
        (None, None) => {
            let browser = BrowserLogin::new().with_timeout(timeout);
            client.login_with_browser(&browser).await?;
        }
    }

    lock_cache(&store.customer_cache(cache_dir)).set(&config.to_value())?;

    println!("Login successful");
    Ok(())
}

/// Run the logout command.
pub fn run_logout(store: &CacheStore, cache_dir: Option<&Path>) -> Result<(), OxApiError> {
    lock_cache(&store.token_cache(cache_dir)).clear()?;
    println!("Logged out");
    Ok(())
}

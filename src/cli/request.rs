use std::io::IsTerminal;
use std::path::Path;

use crate::cache::CacheStore;
use crate::client::RequestOptions;
use crate::config::ClientConfig;
use crate::error::OxApiError;

use super::login::resolve_config;
use super::output::print_response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Head,
    Options,
    Post,
    Put,
    Delete,
}

/// Parse `key=value` query arguments.
pub fn parse_query_pairs(args: &[String]) -> Result<Vec<(String, String)>, OxApiError> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| {
                    OxApiError::ConfigError(format!("Query parameter '{arg}' is not key=value"))
                })
        })
        .collect()
}

/// Build request options from CLI inputs. `data` is sent as JSON when it
/// parses as JSON and as a raw body otherwise.
pub fn build_options(query: &[String], data: Option<&str>) -> Result<RequestOptions, OxApiError> {
    let mut options = RequestOptions::new();
    options.query = parse_query_pairs(query)?;
    if let Some(data) = data {
        options = match serde_json::from_str(data) {
            Ok(json) => options.json(json),
            Err(_) => options.body(data),
        };
    }
    Ok(options)
}

/// Run an authenticated request command.
#[allow(clippy::too_many_arguments)]
pub async fn run_request(
    store: &CacheStore,
    cache_dir: Option<&Path>,
    overrides: ClientConfig,
    verb: Verb,
    url: &str,
    query: &[String],
    data: Option<&str>,
    raw: bool,
) -> Result<(), OxApiError> {
    let config = resolve_config(store, cache_dir, overrides)?;
    let client = config
        .build_client()?
        .with_token_cache(store.token_cache(cache_dir));
    let options = build_options(query, data)?;

    let resp = match verb {
        Verb::Get => client.get(url, options).await?,
        Verb::Head => client.head(url, options).await?,
        Verb::Options => client.options(url, options).await?,
        Verb::Post => client.post(url, options).await?,
        Verb::Put => client.put(url, options).await?,
        Verb::Delete => client.delete(url, options).await?,
    };

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| OxApiError::Http(format!("Failed to read response body: {e}")))?;
    print_response(status, &body, raw, std::io::stdout().is_terminal());

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(OxApiError::NotAuthenticated);
    }
    if !status.is_success() {
        return Err(OxApiError::Http(format!("Request failed with status {status}")));
    }
    Ok(())
}

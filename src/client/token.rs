use serde::{Deserialize, Serialize};

use crate::error::OxApiError;

/// Temporary credentials handed out by the SSO `initiate` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub oauth_token: String,
    pub oauth_token_secret: String,
}

/// Token credentials returned by the SSO `token` endpoint.
///
/// Any additional fields in the response are kept in `extra` so they survive a
/// trip through the token cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AccessToken {
    pub fn new(oauth_token: impl Into<String>, oauth_token_secret: impl Into<String>) -> Self {
        Self {
            oauth_token: oauth_token.into(),
            oauth_token_secret: oauth_token_secret.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Parse an `application/x-www-form-urlencoded` token response.
fn parse_credentials(body: &str) -> Result<(String, String, Vec<(String, String)>), OxApiError> {
    let mut token = None;
    let mut secret = None;
    let mut rest = Vec::new();
    for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => rest.push((key.into_owned(), value.into_owned())),
        }
    }
    match (token, secret) {
        (Some(t), Some(s)) if !t.is_empty() => Ok((t, s, rest)),
        _ => Err(OxApiError::AuthFailure(format!(
            "Token response is missing oauth_token or oauth_token_secret: {body}"
        ))),
    }
}

pub fn parse_request_token(body: &str) -> Result<RequestToken, OxApiError> {
    let (oauth_token, oauth_token_secret, _) = parse_credentials(body)?;
    Ok(RequestToken {
        oauth_token,
        oauth_token_secret,
    })
}

pub fn parse_access_token(body: &str) -> Result<AccessToken, OxApiError> {
    let (oauth_token, oauth_token_secret, rest) = parse_credentials(body)?;
    let extra = rest
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect();
    Ok(AccessToken {
        oauth_token,
        oauth_token_secret,
        extra,
    })
}

/// Extract `oauth_verifier` from an authorization redirect.
///
/// Accepts an absolute URL (`https://host/cb?oauth_verifier=...`) or a bare
/// request path (`/cb?oauth_verifier=...`).
pub fn parse_verifier(redirect: &str) -> Result<String, OxApiError> {
    let redirect = redirect.trim();
    let query = redirect
        .split_once('?')
        .map(|(_, q)| q)
        .ok_or_else(|| {
            OxApiError::AuthFailure(format!("Authorization redirect has no query: {redirect}"))
        })?;
    let query = query.split('#').next().unwrap_or_default();

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, v)| k == "oauth_verifier" && !v.is_empty())
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| {
            OxApiError::AuthFailure(format!(
                "No oauth_verifier found in authorization redirect: {redirect}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_request_token_response() {
        let token =
            parse_request_token("oauth_token=rt&oauth_token_secret=rs&oauth_callback_confirmed=true")
                .unwrap();
        assert_eq!(token.oauth_token, "rt");
        assert_eq!(token.oauth_token_secret, "rs");
    }

    #[test]
    fn parse_access_token_keeps_extra_fields() {
        let token = parse_access_token("oauth_token=at&oauth_token_secret=as&user_id=42").unwrap();
        assert_eq!(token.oauth_token, "at");
        assert_eq!(token.oauth_token_secret, "as");
        assert_eq!(token.extra["user_id"], "42");
    }

    #[test]
    fn parse_token_missing_secret_fails() {
        let err = parse_access_token("oauth_token=at").unwrap_err();
        assert_eq!(err.code(), "auth_failure");
    }

    #[test]
    fn parse_token_rejects_html() {
        assert!(parse_request_token("<html>Unauthorized</html>").is_err());
    }

    #[test]
    fn access_token_json_shape() {
        let mut token = AccessToken::new("at", "as");
        token.extra.insert("user_id".into(), "42".into());
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "oauth_token": "at",
                "oauth_token_secret": "as",
                "user_id": "42",
            })
        );
        let back: AccessToken = serde_json::from_value(json).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn verifier_from_absolute_url() {
        let v = parse_verifier("https://sso.example.com/cb?oauth_token=rt&oauth_verifier=XYZ").unwrap();
        assert_eq!(v, "XYZ");
    }

    #[test]
    fn verifier_from_request_path() {
        assert_eq!(parse_verifier("/cb?oauth_verifier=abc%20def").unwrap(), "abc def");
    }

    #[test]
    fn verifier_ignores_fragment() {
        assert_eq!(parse_verifier("oob?oauth_verifier=v1#frag").unwrap(), "v1");
    }

    #[test]
    fn verifier_missing_is_auth_failure() {
        assert!(parse_verifier("/cb?oauth_token=rt").is_err());
        assert!(parse_verifier("/cb?oauth_verifier=").is_err());
        assert!(parse_verifier("/cb").is_err());
    }
}

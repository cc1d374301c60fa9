use serde::{Deserialize, Serialize};

use crate::client::{AuthData, OxApiClient};
use crate::error::OxApiError;

/// Consumer credentials and endpoints for one customer.
///
/// This is also the payload of the customer-credentials cache, so a login
/// only needs the values once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_hostname: Option<String>,
}

impl ClientConfig {
    /// Decode a cached customer record. Anything but a well-formed JSON
    /// object gives an empty config.
    pub fn from_cached(value: Option<serde_json::Value>) -> Self {
        match value {
            Some(v @ serde_json::Value::Object(_)) => serde_json::from_value(v).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable cached customer credentials: {e}");
                Self::default()
            }),
            Some(other) => {
                tracing::warn!("Ignoring cached customer credentials that are not an object: {other}");
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Values set in `self` win over values in `fallback`.
    pub fn merge(self, fallback: ClientConfig) -> ClientConfig {
        ClientConfig {
            customer_key: self.customer_key.or(fallback.customer_key),
            customer_secret: self.customer_secret.or(fallback.customer_secret),
            realm: self.realm.or(fallback.realm),
            domain: self.domain.or(fallback.domain),
            api_hostname: self.api_hostname.or(fallback.api_hostname),
        }
    }

    pub fn auth_data(&self) -> Result<AuthData, OxApiError> {
        let key = required(&self.customer_key, "customer key (--customer-key or OXAPI_CUSTOMER_KEY)")?;
        let secret = required(
            &self.customer_secret,
            "customer secret (--customer-secret or OXAPI_CUSTOMER_SECRET)",
        )?;
        Ok(AuthData::new(key, secret, self.realm.clone()))
    }

    pub fn build_client(&self) -> Result<OxApiClient, OxApiError> {
        let api_hostname = required(
            &self.api_hostname,
            "API hostname (--api-hostname or OXAPI_API_HOSTNAME)",
        )?;
        Ok(OxApiClient::new(
            self.auth_data()?,
            self.domain.as_deref(),
            api_hostname,
        ))
    }
}

fn required(value: &Option<String>, what: &str) -> Result<String, OxApiError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| OxApiError::ConfigError(format!("Missing {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> ClientConfig {
        ClientConfig {
            customer_key: Some("key".into()),
            customer_secret: Some("secret".into()),
            realm: Some("realm".into()),
            domain: Some("sso.example.com".into()),
            api_hostname: Some("api.example.com".into()),
        }
    }

    #[test]
    fn merge_prefers_explicit_values() {
        let explicit = ClientConfig {
            customer_key: Some("other".into()),
            ..Default::default()
        };
        let merged = explicit.merge(full());
        assert_eq!(merged.customer_key.as_deref(), Some("other"));
        assert_eq!(merged.customer_secret.as_deref(), Some("secret"));
        assert_eq!(merged.api_hostname.as_deref(), Some("api.example.com"));
    }

    #[test]
    fn cached_roundtrip() {
        let cfg = full();
        assert_eq!(ClientConfig::from_cached(Some(cfg.to_value())), cfg);
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let cfg = ClientConfig {
            customer_key: Some("k".into()),
            ..Default::default()
        };
        assert_eq!(cfg.to_value(), serde_json::json!({ "customer_key": "k" }));
    }

    #[test]
    fn malformed_cache_gives_empty_config() {
        let cfg = ClientConfig::from_cached(Some(serde_json::json!(["not", "an", "object"])));
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(ClientConfig::from_cached(None), ClientConfig::default());
    }

    #[test]
    fn non_object_cache_values_are_ignored() {
        for value in [
            serde_json::json!("key"),
            serde_json::json!(42),
            serde_json::json!(null),
            serde_json::json!(["k", "s", "realm", "sso.example.com", "api.example.com"]),
        ] {
            assert_eq!(ClientConfig::from_cached(Some(value)), ClientConfig::default());
        }
    }

    #[test]
    fn object_with_wrong_field_type_is_ignored() {
        let cfg = ClientConfig::from_cached(Some(serde_json::json!({ "customer_key": 7 })));
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn missing_secret_is_config_error() {
        let cfg = ClientConfig {
            customer_key: Some("k".into()),
            ..Default::default()
        };
        let err = cfg.auth_data().unwrap_err();
        assert_eq!(err.code(), "config_error");
        assert!(err.to_string().contains("customer secret"));
    }

    #[test]
    fn build_client_requires_api_hostname() {
        let cfg = ClientConfig {
            api_hostname: None,
            ..full()
        };
        assert!(cfg.build_client().is_err());
    }

    #[test]
    fn build_client_uses_domain() {
        let client = full().build_client().unwrap();
        assert_eq!(client.sso_base_url(), "https://sso.example.com");
        assert_eq!(client.api_hostname(), "api.example.com");
        assert_eq!(client.auth_data().realm.as_deref(), Some("realm"));
    }
}

use oauth1_request as oauth;

use crate::client::token::RequestToken;

/// Consumer credentials and realm, fixed at client construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthData {
    pub customer_key: String,
    pub customer_secret: String,
    pub realm: Option<String>,
}

impl AuthData {
    pub fn new(
        customer_key: impl Into<String>,
        customer_secret: impl Into<String>,
        realm: Option<String>,
    ) -> Self {
        Self {
            customer_key: customer_key.into(),
            customer_secret: customer_secret.into(),
            realm,
        }
    }
}

/// Signs SSO requests with HMAC-SHA1 for one authorization flow.
#[derive(Debug, Clone)]
pub struct OAuthSession {
    auth: AuthData,
    callback_uri: String,
}

impl OAuthSession {
    pub fn new(auth: AuthData, callback_uri: impl Into<String>) -> Self {
        Self {
            auth,
            callback_uri: callback_uri.into(),
        }
    }

    fn client_credentials(&self) -> oauth::Credentials<&str> {
        oauth::Credentials::new(self.auth.customer_key.as_str(), self.auth.customer_secret.as_str())
    }

    /// `Authorization` header for the request-token call.
    pub fn request_token_header(&self, uri: &str) -> String {
        let mut builder = oauth::Builder::<_, _>::new(self.client_credentials(), oauth::HmacSha1::new());
        builder.callback(self.callback_uri.as_str());
        self.with_realm(builder.post(uri, &()))
    }

    /// `Authorization` header for exchanging a verifier at the token endpoint.
    pub fn access_token_header(&self, uri: &str, token: &RequestToken, verifier: &str) -> String {
        let mut builder = oauth::Builder::<_, _>::new(self.client_credentials(), oauth::HmacSha1::new());
        builder
            .token(oauth::Credentials::new(
                token.oauth_token.as_str(),
                token.oauth_token_secret.as_str(),
            ))
            .verifier(verifier);
        self.with_realm(builder.post(uri, &()))
    }

    // The realm is not part of the signature base string, only the header.
    fn with_realm(&self, header: String) -> String {
        match self.auth.realm.as_deref() {
            Some(realm) if !realm.is_empty() => {
                let realm = realm.replace('\\', "\\\\").replace('"', "\\\"");
                match header.strip_prefix("OAuth ") {
                    Some(params) => format!("OAuth realm=\"{realm}\",{params}"),
                    None => header,
                }
            }
            _ => header,
        }
    }
}

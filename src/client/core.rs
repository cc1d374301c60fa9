use std::collections::BTreeMap;

use reqwest::Method;

use crate::cache::{lock_cache, SharedCache};
use crate::client::browser_login::BrowserLogin;
use crate::client::request::{prepare_request, RequestOptions};
use crate::client::signing::{AuthData, OAuthSession};
use crate::client::token::{
    parse_access_token, parse_request_token, parse_verifier, AccessToken, RequestToken,
};
use crate::error::OxApiError;

pub const DEFAULT_SSO_DOMAIN: &str = "sso.openx.com";

const INITIATE_PATH: &str = "/api/index/initiate";
const TOKEN_PATH: &str = "/api/index/token";
pub const LOGIN_PATH: &str = "/login/login";
pub const PROCESS_PATH: &str = "/login/process";

/// Callback value for flows without a redirect target.
const OUT_OF_BAND: &str = "oob";

/// OAuth1 client for the SSO service plus authenticated calls to the API.
pub struct OxApiClient {
    auth: AuthData,
    http: reqwest::Client,
    session: Option<OAuthSession>,
    request_token: Option<RequestToken>,
    access_token: Option<AccessToken>,
    sso_base_url: String,
    api_hostname: String,
    default_headers: BTreeMap<String, String>,
    token_cache: Option<SharedCache<AccessToken>>,
}

impl OxApiClient {
    /// `domain` is the SSO host (`sso.openx.com` when absent). A value with
    /// an explicit `http://` or `https://` scheme is used as the base URL as is.
    pub fn new(auth: AuthData, domain: Option<&str>, api_hostname: impl Into<String>) -> Self {
        let domain = domain.filter(|d| !d.is_empty()).unwrap_or(DEFAULT_SSO_DOMAIN);
        let sso_base_url = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.trim_end_matches('/').to_string()
        } else {
            format!("https://{domain}")
        };
        Self {
            auth,
            http: reqwest::Client::new(),
            session: None,
            request_token: None,
            access_token: None,
            sso_base_url,
            api_hostname: api_hostname.into(),
            default_headers: BTreeMap::new(),
            token_cache: None,
        }
    }

    /// Point the client at an SSO base URL including its scheme.
    pub fn with_sso_base_url(mut self, url: impl Into<String>) -> Self {
        self.sso_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Read tokens from, and save new tokens to, `cache`.
    pub fn with_token_cache(mut self, cache: SharedCache<AccessToken>) -> Self {
        self.token_cache = Some(cache);
        self
    }

    pub fn auth_data(&self) -> &AuthData {
        &self.auth
    }

    pub fn sso_base_url(&self) -> &str {
        &self.sso_base_url
    }

    pub fn api_hostname(&self) -> &str {
        &self.api_hostname
    }

    pub fn request_token(&self) -> Option<&RequestToken> {
        self.request_token.as_ref()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn set_access_token(&mut self, token: AccessToken) {
        self.access_token = Some(token);
    }

    /// Headers the SSO session sends once logged in. API verbs never carry
    /// them, so a cached token and a fresh login produce identical requests.
    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }

    /// Start a new authorization flow by fetching a request token.
    pub async fn obtain_request_token(
        &mut self,
        callback_uri: &str,
    ) -> Result<&RequestToken, OxApiError> {
        let session = OAuthSession::new(self.auth.clone(), callback_uri);
        let url = format!("{}{INITIATE_PATH}", self.sso_base_url);
        tracing::debug!("Requesting OAuth request token from {url}");

        let body = self
            .signed_post(&url, session.request_token_header(&url))
            .await?;
        let token = parse_request_token(&body)?;

        self.session = Some(session);
        Ok(&*self.request_token.insert(token))
    }

    /// Authorization page for the current request token.
    pub fn authorization_url(&self, endpoint_path: &str) -> Result<String, OxApiError> {
        let token = self.request_token.as_ref().ok_or_else(|| {
            OxApiError::AuthFailure("No request token; the authorization flow was not started".into())
        })?;
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("oauth_token", &token.oauth_token)
            .finish();
        Ok(format!("{}{endpoint_path}?{query}", self.sso_base_url))
    }

    /// Trade an authorization verifier for the access token.
    pub async fn exchange_verifier(&mut self, verifier: &str) -> Result<&AccessToken, OxApiError> {
        let (session, request_token) = match (&self.session, &self.request_token) {
            (Some(s), Some(t)) => (s, t),
            _ => {
                return Err(OxApiError::AuthFailure(
                    "Cannot exchange a verifier before obtaining a request token".into(),
                ))
            }
        };
        let url = format!("{}{TOKEN_PATH}", self.sso_base_url);
        let header = session.access_token_header(&url, request_token, verifier);

        let body = self.signed_post(&url, header).await?;
        let token = parse_access_token(&body)?;
        tracing::debug!("Obtained OAuth access token");

        Ok(&*self.access_token.insert(token))
    }

    /// Log in with a username and password, or through the browser when
    /// either is missing.
    pub async fn login(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), OxApiError> {
        match (username, password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                self.password_login(user, pass).await?;
            }
            _ => BrowserLogin::new().interactive_login(self).await?,
        }
        self.finish_login()
    }

    /// Interactive login driven by a customized [`BrowserLogin`].
    pub async fn login_with_browser(&mut self, browser: &BrowserLogin) -> Result<(), OxApiError> {
        browser.interactive_login(self).await?;
        self.finish_login()
    }

    async fn password_login(&mut self, username: &str, password: &str) -> Result<(), OxApiError> {
        let oauth_token = self.obtain_request_token(OUT_OF_BAND).await?.oauth_token.clone();
        let url = self.authorization_url(PROCESS_PATH)?;

        let resp = self
            .http
            .post(&url)
            .form(&[
                ("email", username),
                ("password", password),
                ("oauth_token", oauth_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OxApiError::AuthFailure(format!("Login request failed: {e}")))?;
        let redirect = response_text(resp, "Login").await?;

        let verifier = parse_verifier(&redirect)?;
        self.exchange_verifier(&verifier).await?;
        Ok(())
    }

    fn finish_login(&mut self) -> Result<(), OxApiError> {
        self.default_headers
            .insert("content-type".into(), "application/json".into());
        self.default_headers
            .insert("accept".into(), "application/json".into());

        if let (Some(cache), Some(token)) = (&self.token_cache, &self.access_token) {
            lock_cache(cache).set(token)?;
        }
        tracing::info!("Logged in to {}", self.sso_base_url);
        Ok(())
    }

    async fn signed_post(
        &self,
        url: &str,
        authorization: String,
    ) -> Result<String, OxApiError> {
        let resp = self
            .http
            .post(url)
            .headers(self.session_headers())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| OxApiError::AuthFailure(format!("Request to {url} failed: {e}")))?;
        response_text(resp, "OAuth").await
    }

    fn session_headers(&self) -> reqwest::header::HeaderMap {
        self.default_headers
            .iter()
            .filter_map(|(name, value)| {
                Some((
                    reqwest::header::HeaderName::from_bytes(name.as_bytes()).ok()?,
                    reqwest::header::HeaderValue::from_str(value).ok()?,
                ))
            })
            .collect()
    }

    /// The in-memory token, falling back to the token cache.
    fn current_token(&self) -> Result<AccessToken, OxApiError> {
        if let Some(token) = &self.access_token {
            return Ok(token.clone());
        }
        if let Some(cache) = &self.token_cache {
            if let Some(token) = lock_cache(cache).get()? {
                return Ok(token);
            }
        }
        Err(OxApiError::NotAuthenticated)
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, OxApiError> {
        self.send(Method::GET, url, options).await
    }

    pub async fn head(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, OxApiError> {
        self.send(Method::HEAD, url, options).await
    }

    pub async fn options(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, OxApiError> {
        self.send(Method::OPTIONS, url, options).await
    }

    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, OxApiError> {
        self.send(Method::POST, url, options).await
    }

    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, OxApiError> {
        self.send(Method::PUT, url, options).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<reqwest::Response, OxApiError> {
        self.send(Method::DELETE, url, options).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<reqwest::Response, OxApiError> {
        let token = self.current_token()?;
        let (url, options) = prepare_request(&self.api_hostname, url, options, &token);
        tracing::debug!("{method} {url}");

        let mut req = self.http.request(method, &url);
        for (name, value) in &options.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = options.cookie_header() {
            req = req.header(reqwest::header::COOKIE, cookie);
        }
        if !options.query.is_empty() {
            req = req.query(&options.query);
        }
        if let Some(json) = &options.json {
            req = req.json(json);
        } else if !options.form.is_empty() {
            req = req.form(&options.form);
        } else if let Some(body) = options.body {
            req = req.body(body);
        }
        if let Some(timeout) = options.timeout {
            req = req.timeout(timeout);
        }

        req.send()
            .await
            .map_err(|e| OxApiError::Http(format!("Request to {url} failed: {e}")))
    }
}

async fn response_text(resp: reqwest::Response, what: &str) -> Result<String, OxApiError> {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(OxApiError::AuthFailure(format!(
            "{what} request failed with status {status}: {body}"
        )));
    }
    Ok(body)
}

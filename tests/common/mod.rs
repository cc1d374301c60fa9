use wiremock::matchers::{header_exists, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REQUEST_TOKEN: &str = "rt-123";
pub const ACCESS_TOKEN: &str = "at-456";
pub const ACCESS_SECRET: &str = "as-789";

/// Start a fake SSO service that hands out a fixed request token and trades
/// `verifier` for a fixed access token.
#[allow(dead_code)]
pub async fn start_fake_sso(verifier: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/index/initiate"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "oauth_token={REQUEST_TOKEN}&oauth_token_secret=rs&oauth_callback_confirmed=true"
        )))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/index/token"))
        .and(header_regex(
            "authorization",
            &format!("oauth_verifier=\"{verifier}\""),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "oauth_token={ACCESS_TOKEN}&oauth_token_secret={ACCESS_SECRET}"
        )))
        .mount(&server)
        .await;

    server
}

/// Accept a password login and answer with a redirect carrying `verifier`.
#[allow(dead_code)]
pub async fn mount_password_login(server: &MockServer, verifier: &str) {
    Mock::given(method("POST"))
        .and(path("/login/process"))
        .and(query_param("oauth_token", REQUEST_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "https://sso.example.com/cb?oauth_token={REQUEST_TOKEN}&oauth_verifier={verifier}"
        )))
        .mount(server)
        .await;
}

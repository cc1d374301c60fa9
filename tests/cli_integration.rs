use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod common;

fn oxapi_cmd(cache_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("oxapi").unwrap();
    cmd.env("OXAPI_CACHE_DIR", cache_dir)
        .env_remove("OXAPI_CUSTOMER_KEY")
        .env_remove("OXAPI_CUSTOMER_SECRET")
        .env_remove("OXAPI_API_HOSTNAME")
        .env_remove("OXAPI_DOMAIN")
        .env_remove("OXAPI_USERNAME")
        .env_remove("OXAPI_PASSWORD");
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    oxapi_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("get"));
}

#[test]
fn get_without_credentials_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    oxapi_cmd(dir.path())
        .args(["get", "/account"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing"));
}

#[test]
fn get_before_login_is_not_authenticated() {
    let dir = tempfile::tempdir().unwrap();
    oxapi_cmd(dir.path())
        .args([
            "--customer-key",
            "k",
            "--customer-secret",
            "s",
            "--api-hostname",
            "api.example.com",
            "get",
            "/account",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not authenticated"));
}

#[test]
fn json_errors_flag_prints_error_code() {
    let dir = tempfile::tempdir().unwrap();
    oxapi_cmd(dir.path())
        .args([
            "--json-errors",
            "--customer-key",
            "k",
            "--customer-secret",
            "s",
            "--api-hostname",
            "api.example.com",
            "delete",
            "/account/1",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"not_authenticated\""));
}

/// Log in with a password, then call the API with only the cache directory.
#[tokio::test(flavor = "multi_thread")]
async fn password_login_then_cached_request() {
    let server = common::start_fake_sso("XYZ").await;
    common::mount_password_login(&server, "XYZ").await;
    Mock::given(method("GET"))
        .and(path("/ox/4.0/account"))
        .and(header("cookie", format!("openx3_access_token={}", common::ACCESS_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"account":"acme"}"#))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sso_url = server.uri();
    let cache_dir = dir.path().to_path_buf();

    let login = tokio::task::spawn_blocking({
        let cache_dir = cache_dir.clone();
        move || {
            oxapi_cmd(&cache_dir)
                .args([
                    "--customer-key",
                    "k",
                    "--customer-secret",
                    "s",
                    "--domain",
                    sso_url.as_str(),
                    "--api-hostname",
                    "api.example.com",
                    "login",
                    "--username",
                    "user@example.com",
                    "--password",
                    "pw",
                ])
                .assert()
                .success()
                .stdout(predicate::str::contains("Login successful"));
        }
    });
    login.await.unwrap();

    assert!(cache_dir.join(".oxApiToken").exists());
    assert!(cache_dir.join(".oxApiCustomer").exists());

    let account_url = format!("{}/ox/4.0/account", server.uri());
    let request = tokio::task::spawn_blocking(move || {
        oxapi_cmd(&cache_dir)
            .args(["get", account_url.as_str(), "--raw"])
            .assert()
            .success()
            .stdout(predicate::str::contains("acme"));

        oxapi_cmd(&cache_dir).arg("logout").assert().success();
        assert!(!cache_dir.join(".oxApiToken").exists());
    });
    request.await.unwrap();
}

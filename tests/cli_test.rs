#![allow(deprecated)]

//! End-to-end tests for the `oidclite` binary
//!
//! The provider is a wiremock server; the binary runs as a child process
//! with its environment scrubbed of `OIDCLITE_*` overrides.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn oidclite(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("oidclite").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("OIDCLITE_DISCOVERY_URL")
        .env_remove("OIDCLITE_CLIENT_ID")
        .env_remove("OIDCLITE_CLIENT_SECRET")
        .env_remove("OIDCLITE_REDIRECT_URI")
        .env_remove("OIDCLITE_SCOPES")
        .env_remove("OIDCLITE_HTTP_TIMEOUT_SECONDS");
    cmd
}

fn provider_args(server: &MockServer) -> Vec<String> {
    vec![
        "--discovery-url".to_string(),
        common::discovery_url(server),
        "--client-id".to_string(),
        "cli-client".to_string(),
    ]
}

fn read_session(path: &std::path::Path) -> serde_json::Value {
    let raw = std::fs::read_to_string(path).expect("session file must exist");
    serde_json::from_str(&raw).expect("session file must be JSON")
}

// ---------------------------------------------------------------------------
// Argument handling
// ---------------------------------------------------------------------------

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    oidclite(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("authorize"))
        .stdout(predicate::str::contains("exchange"));
}

#[test]
fn test_exchange_requires_code_or_callback() {
    let dir = TempDir::new().unwrap();
    oidclite(&dir).arg("exchange").assert().failure();
}

#[test]
fn test_missing_client_id_fails_validation() {
    let dir = TempDir::new().unwrap();
    oidclite(&dir)
        .args([
            "--discovery-url",
            "https://idp.example.com/.well-known/openid-configuration",
            "discover",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("client_id cannot be empty"));
}

#[test]
fn test_invalid_redirect_in_config_file_fails_validation() {
    let (dir, path) = common::temp_config_file(
        "client:\n  discovery_url: https://idp.example.com/.well-known/openid-configuration\n  client_id: app\n  redirect_uri: https://app.example.com/cb\n",
    );
    let mut cmd = Command::cargo_bin("oidclite").unwrap();
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(path)
        .arg("discover")
        .assert()
        .failure()
        .stderr(predicate::str::contains("custom scheme"));
}

// ---------------------------------------------------------------------------
// Commands against a mock provider
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_discover_prints_document() {
    let server = MockServer::start().await;
    common::mount_discovery(&server, common::discovery_body(&server)).await;
    let dir = TempDir::new().unwrap();

    oidclite(&dir)
        .args(provider_args(&server))
        .arg("discover")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authorization_endpoint\""))
        .stdout(predicate::str::contains(format!("{}/token", server.uri())));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_discover_failure_exits_non_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(common::DISCOVERY_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    oidclite(&dir)
        .args(provider_args(&server))
        .arg("discover")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Discovery failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_authorize_then_exchange_with_callback_url() {
    let server = MockServer::start().await;
    common::mount_discovery(&server, common::discovery_body(&server)).await;
    let dir = TempDir::new().unwrap();
    let session_file = dir.path().join("session.json");

    oidclite(&dir)
        .args(provider_args(&server))
        .arg("authorize")
        .arg("--session-file")
        .arg(&session_file)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{}/authorize?client_id=cli-client", server.uri())))
        .stdout(predicate::str::contains("code_challenge_method=S256"));

    let session = read_session(&session_file);
    let state = session["state"].as_str().unwrap().to_string();
    let verifier = session["code_verifier"].as_str().unwrap().to_string();

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains(format!("code_verifier={}", verifier)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "cli-access-token",
            "id_token": "cli-id-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    oidclite(&dir)
        .args(provider_args(&server))
        .arg("exchange")
        .arg("--session-file")
        .arg(&session_file)
        .arg("--callback-url")
        .arg(format!("oidclite://openID?code=the-code&state={}", state))
        .assert()
        .success()
        .stdout(predicate::str::contains("cli-access-token"));

    server.verify().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exchange_rejects_forged_state() {
    let server = MockServer::start().await;
    common::mount_discovery(&server, common::discovery_body(&server)).await;
    let dir = TempDir::new().unwrap();
    let session_file = dir.path().join("session.json");

    oidclite(&dir)
        .args(provider_args(&server))
        .arg("authorize")
        .arg("--session-file")
        .arg(&session_file)
        .assert()
        .success();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    oidclite(&dir)
        .args(provider_args(&server))
        .arg("exchange")
        .arg("--session-file")
        .arg(&session_file)
        .arg("--callback-url")
        .arg("oidclite://openID?code=the-code&state=forged")
        .assert()
        .failure()
        .stderr(predicate::str::contains("state mismatch"));

    server.verify().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exchange_with_bare_code_reports_provider_rejection() {
    let server = MockServer::start().await;
    common::mount_discovery(&server, common::discovery_body(&server)).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let session_file = dir.path().join("session.json");

    oidclite(&dir)
        .args(provider_args(&server))
        .arg("authorize")
        .arg("--session-file")
        .arg(&session_file)
        .assert()
        .success();

    oidclite(&dir)
        .args(provider_args(&server))
        .arg("exchange")
        .arg("--session-file")
        .arg(&session_file)
        .arg("--code")
        .arg("stale-code")
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider returned HTTP 400"));
}

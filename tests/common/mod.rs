//! Shared fixtures for integration tests against a mock forum

#![allow(dead_code)]

use serde_json::{json, Value};
use std::time::Duration;
use vbulletin_client::{ClientConfig, ForumClient};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_PATH: &str = "/forum/api.php";
pub const API_KEY: &str = "test-api-key";

pub const ACCESS_TOKEN: &str = "a1b2c3";
pub const CLIENT_ID: &str = "42";
pub const SECRET: &str = "s3cret";

/// Successful `api_init` response
pub fn handshake_body() -> Value {
    json!({
        "apiversion": "6",
        "apiaccesstoken": ACCESS_TOKEN,
        "sessionhash": "hash",
        "apiclientid": 42,
        "secret": SECRET,
        "bbtitle": "Test Forum"
    })
}

pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_url: format!("{}{}", server.uri(), API_PATH),
        api_key: API_KEY.into(),
        platform_name: "tests".into(),
        platform_version: "1.0".into(),
        init_timeout_secs: 5,
        ..Default::default()
    }
}

/// Multipart field as it appears in a request body
pub fn form_field(name: &str, value: &str) -> String {
    format!("name=\"{name}\"\r\n\r\n{value}\r\n")
}

/// Answer `api_init` with `body` after `delay`
pub async fn mount_handshake(server: &MockServer, body: Value, delay: Duration) {
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains(form_field("api_m", "api_init")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .mount(server)
        .await;
}

/// Answer a signed method with `body`
pub async fn mount_method(server: &MockServer, api_method: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains(form_field("api_m", api_method)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// A client whose handshake has completed
pub async fn connected_client(server: &MockServer) -> ForumClient {
    mount_handshake(server, handshake_body(), Duration::ZERO).await;
    ForumClient::open(config(server)).await.unwrap()
}

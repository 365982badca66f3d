//! Retry policy tests for the registration client.
//!
//! Run with: cargo test --test register_retry_test

use std::time::{Duration, Instant};

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rustplus_pair::credentials::{AppIdentity, DeviceIdentity};
use rustplus_pair::register::RegistrationClient;
use rustplus_pair::Error;

fn test_app() -> AppIdentity {
    AppIdentity::rust_companion()
}

fn test_identity() -> DeviceIdentity {
    DeviceIdentity::new("100", "200").unwrap()
}

#[tokio::test]
async fn test_error_responses_exhaust_exactly_six_attempts() {
    let server = MockServer::start().await;

    // expect(6) fails the test on a 7th attempt as well as on a 5th
    Mock::given(method("POST"))
        .and(path("/c2dm/register3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Error=PHONE_REGISTRATION_ERROR"))
        .expect(6)
        .mount(&server)
        .await;

    let client = RegistrationClient::new(
        reqwest::Client::new(),
        format!("{}/c2dm/register3", server.uri()),
    );

    let started = Instant::now();
    let result = client.register(&test_identity(), "auth", &test_app()).await;

    assert!(matches!(result, Err(Error::Registration)));
    // 5 inter-attempt delays of 1 s each
    assert!(
        started.elapsed() >= Duration::from_secs(5),
        "six attempts must be spaced by the fixed delay, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_retries_until_success_with_fixed_delay() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/c2dm/register3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Error=SERVICE_NOT_AVAILABLE"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/c2dm/register3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("token=SUCCESS"))
        .expect(1)
        .mount(&server)
        .await;

    let client = RegistrationClient::new(
        reqwest::Client::new(),
        format!("{}/c2dm/register3", server.uri()),
    );

    let started = Instant::now();
    let token = client
        .register(&test_identity(), "auth", &test_app())
        .await
        .expect("third attempt succeeds");

    assert_eq!(token, "SUCCESS");
    assert!(
        started.elapsed() >= Duration::from_secs(2),
        "two retries must wait the fixed delay each, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_token_is_everything_after_the_first_equals() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/c2dm/register3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("...=ABC123"))
        .expect(1)
        .mount(&server)
        .await;

    let client = RegistrationClient::new(
        reqwest::Client::new(),
        format!("{}/c2dm/register3", server.uri()),
    );

    let token = client
        .register(&test_identity(), "auth", &test_app())
        .await
        .unwrap();
    assert_eq!(token, "ABC123");
}

#[tokio::test]
async fn test_request_carries_device_login_and_installation_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/c2dm/register3"))
        .and(header("Authorization", "AidLogin 100:200"))
        .and(wiremock::matchers::body_string_contains(
            "X-Goog-Firebase-Installations-Auth=install-auth",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("token=OK"))
        .expect(1)
        .mount(&server)
        .await;

    let client = RegistrationClient::new(
        reqwest::Client::new(),
        format!("{}/c2dm/register3", server.uri()),
    );

    let token = client
        .register(&test_identity(), "install-auth", &test_app())
        .await
        .unwrap();
    assert_eq!(token, "OK");
}

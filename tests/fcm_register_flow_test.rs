//! End-to-end registration flow against wiremock fixtures.
//!
//! Run with: cargo test --test fcm_register_flow_test

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rustplus_pair::{ConfigFile, Endpoints, Orchestrator, PairingSession};

async fn mock_vendor_services(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/checkin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "android_id": 100,
            "security_token": 200,
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/projects/rust-companion-app/installations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authToken": { "token": "T1" }
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/c2dm/register3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("=PUSH1"))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/expo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "expoPushToken": "EXPO1" }
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/companion/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(server)
        .await;
}

fn endpoints_for(server: &MockServer) -> Endpoints {
    Endpoints {
        checkin_url: format!("{}/checkin", server.uri()),
        installations_base_url: format!("{}/v1", server.uri()),
        register_url: format!("{}/c2dm/register3", server.uri()),
        expo_url: format!("{}/expo", server.uri()),
        companion_register_url: format!("{}/companion/register", server.uri()),
        companion_login_url: format!("{}/login", server.uri()),
    }
}

#[tokio::test]
async fn test_full_registration_persists_the_expected_bundle() {
    let server = MockServer::start().await;
    mock_vendor_services(&server).await;

    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("rustplus.config.json");
    // Pre-existing unrelated state must survive the run
    std::fs::write(&config_path, r#"{"server_ip": "203.0.113.7"}"#).unwrap();
    let config = ConfigFile::new(&config_path);

    let endpoints = endpoints_for(&server);
    let login_url = endpoints.companion_login_url.clone();
    let orchestrator = Orchestrator::new(config.clone(), "127.0.0.1", true)
        .unwrap()
        .with_endpoints(endpoints);

    let session = PairingSession::bind("127.0.0.1", &login_url).await.unwrap();
    let pairing_base = session.base_url().to_string();

    let run = tokio::spawn(async move { orchestrator.run_with_session(session).await });

    // Play the user's browser: deliver the auth token via the callback
    reqwest::Client::new()
        .get(format!("{pairing_base}/callback?token=AUTH1"))
        .header("connection", "close")
        .send()
        .await
        .expect("pairing listener reachable");

    let bundle = run.await.unwrap().expect("flow should succeed");
    assert_eq!(bundle.fcm_credentials.gcm.android_id, "100");
    assert_eq!(bundle.fcm_credentials.gcm.security_token, "200");
    assert_eq!(bundle.fcm_credentials.fcm.token, "PUSH1");
    assert_eq!(bundle.expo_push_token, "EXPO1");
    assert_eq!(bundle.rustplus_auth_token, "AUTH1");

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
    assert_eq!(
        written,
        json!({
            "server_ip": "203.0.113.7",
            "fcm_credentials": {
                "gcm": { "androidId": "100", "securityToken": "200" },
                "fcm": { "token": "PUSH1" }
            },
            "expo_push_token": "EXPO1",
            "rustplus_auth_token": "AUTH1",
        })
    );
}

#[tokio::test]
async fn test_registration_failure_aborts_before_pairing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/projects/rust-companion-app/installations"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"error": "nope"}"#))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("rustplus.config.json");
    let config = ConfigFile::new(&config_path);

    let orchestrator = Orchestrator::new(config, "127.0.0.1", true)
        .unwrap()
        .with_endpoints(endpoints_for(&server));

    let result = orchestrator.run().await;
    assert!(matches!(result, Err(rustplus_pair::Error::Auth(_))));
    // A failed run leaves no partial bundle behind
    assert!(!config_path.exists());
}

//! Firebase installations client.
//!
//! Requests an installation-scoped auth token. Each call simulates a fresh
//! app install: a new random installation id (FID) is generated per call
//! and discarded with the run.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde_json::json;

use crate::constants::{FID_HEADER_NIBBLE, FID_LENGTH_BYTES};
use crate::credentials::AppIdentity;
use crate::error::{Error, Result};

/// Client for the installations service.
#[derive(Debug, Clone)]
pub struct InstallationsClient {
    http: reqwest::Client,
    base_url: String,
}

impl InstallationsClient {
    /// Create a client against the given installations base URL
    /// (`.../v1`; the project path is appended per request).
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Register a fresh installation and return its auth token.
    pub async fn install(&self, app: &AppIdentity) -> Result<String> {
        let fid = generate_fid();
        let url = format!(
            "{}/projects/{}/installations",
            self.base_url, app.project_id
        );

        let body = json!({
            "fid": fid,
            "appId": app.app_id,
            "authVersion": "FIS_v2",
            "sdkVersion": "a:17.0.0",
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &app.api_key)
            .header("X-Android-Package", &app.package_name)
            .header("X-Android-Cert", &app.package_certificate)
            .json(&body)
            .send()
            .await?;

        let raw = response.text().await?;
        let parsed: serde_json::Value =
            serde_json::from_str(&raw).map_err(|_| Error::Auth(raw.clone()))?;

        match parsed["authToken"]["token"].as_str() {
            Some(token) if !token.is_empty() => {
                log::info!("[Install] got installation auth token ({} chars)", token.len());
                Ok(token.to_string())
            }
            _ => Err(Error::Auth(raw)),
        }
    }
}

/// Generate a fresh Firebase installation id.
///
/// 17 random bytes with the first byte's high nibble forced to `0111`,
/// base64 url-safe encoded with padding stripped.
pub fn generate_fid() -> String {
    let mut bytes = [0u8; FID_LENGTH_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes[0] = FID_HEADER_NIBBLE | (bytes[0] & 0x0F);
    URL_SAFE_NO_PAD.encode(bytes)
}

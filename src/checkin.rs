//! Android device check-in.
//!
//! One request/response exchange that mints a device identity (android id
//! + security token) from the check-in service. No retry lives here; the
//! registration layer owns retry policy.

use serde::Deserialize;
use serde_json::json;

use crate::credentials::DeviceIdentity;
use crate::error::{Error, Result};

/// Client for the device check-in endpoint.
#[derive(Debug, Clone)]
pub struct CheckinClient {
    http: reqwest::Client,
    url: String,
}

/// Response fields we consume; everything else in the check-in payload is
/// ignored.
#[derive(Debug, Deserialize)]
struct CheckinResponse {
    android_id: Option<u64>,
    security_token: Option<u64>,
}

impl CheckinClient {
    /// Create a client against the given check-in URL.
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Perform a single check-in and return the issued device identity.
    pub async fn check_in(&self) -> Result<DeviceIdentity> {
        let body = json!({
            "checkin": { "type": 3 },
            "version": 3,
            "id": 0,
            "security_token": 0,
            "fragment": 0,
        });

        let response = self.http.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("check-in returned {status}")));
        }

        let parsed: CheckinResponse = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("check-in response did not parse: {e}")))?;

        let (android_id, security_token) = match (parsed.android_id, parsed.security_token) {
            (Some(id), Some(token)) => (id.to_string(), token.to_string()),
            _ => {
                return Err(Error::Network(
                    "check-in response missing android_id or security_token".to_string(),
                ))
            }
        };

        let identity = DeviceIdentity::new(android_id, security_token)?;
        log::info!(
            "[Checkin] obtained device identity (androidId {} digits)",
            identity.android_id.len()
        );
        Ok(identity)
    }
}

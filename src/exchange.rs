//! One-shot exchanges with the push bridge and the companion server.
//!
//! Both calls are fatal on failure: a clean restart of the whole run is
//! preferred over retrying with possibly stale tokens.

use serde_json::json;
use uuid::Uuid;

use crate::constants::{COMPANION_DEVICE_LABEL, EXPO_PROJECT_ID};
use crate::credentials::AppIdentity;
use crate::error::{Error, Result};

/// Client for the Expo token bridge and the companion registration
/// endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    http: reqwest::Client,
    expo_url: String,
    companion_url: String,
}

impl ExchangeClient {
    /// Create a client against the given bridge and companion URLs.
    pub fn new(
        http: reqwest::Client,
        expo_url: impl Into<String>,
        companion_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            expo_url: expo_url.into(),
            companion_url: companion_url.into(),
        }
    }

    /// Translate a push token into the Expo token namespace.
    pub async fn exchange_for_bridged_token(
        &self,
        app: &AppIdentity,
        push_token: &str,
    ) -> Result<String> {
        let body = json!({
            "type": "fcm",
            "deviceId": Uuid::new_v4().to_string(),
            "development": false,
            "appId": app.package_name,
            "deviceToken": push_token,
            "projectId": EXPO_PROJECT_ID,
        });

        let response = self.http.post(&self.expo_url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("push bridge returned {status}")));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("push bridge response did not parse: {e}")))?;

        match parsed["data"]["expoPushToken"].as_str() {
            Some(token) if !token.is_empty() => {
                log::info!("[Exchange] got bridged push token ({} chars)", token.len());
                Ok(token.to_string())
            }
            _ => Err(Error::Network(
                "push bridge response missing expoPushToken".to_string(),
            )),
        }
    }

    /// Bind the authorization token to the bridged push token on the
    /// companion server.
    pub async fn finalize_registration(
        &self,
        auth_token: &str,
        bridged_token: &str,
    ) -> Result<()> {
        let body = json!({
            "AuthToken": auth_token,
            "DeviceId": COMPANION_DEVICE_LABEL,
            "PushKind": 3,
            "PushToken": bridged_token,
        });

        let response = self.http.post(&self.companion_url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "companion registration returned {status}"
            )));
        }

        log::info!("[Exchange] companion registration acknowledged");
        Ok(())
    }
}

//! GCM registration with bounded retry.
//!
//! Exchanges the check-in identity and installation auth token for a push
//! token. The service intermittently answers with an `Error=...` body even
//! for well-formed requests, so the call retries a fixed number of times
//! with a fixed delay, reusing the same credentials on every attempt.

use tokio::time::sleep;

use crate::constants::{REGISTER_MAX_ATTEMPTS, REGISTER_RETRY_DELAY};
use crate::credentials::{AppIdentity, DeviceIdentity};
use crate::error::{Error, Result};

/// Client for the registration endpoint.
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    http: reqwest::Client,
    url: String,
}

impl RegistrationClient {
    /// Create a client against the given registration URL.
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Register the device and return the push token.
    ///
    /// Makes up to [`REGISTER_MAX_ATTEMPTS`] attempts, sleeping
    /// [`REGISTER_RETRY_DELAY`] between them, as long as the response body
    /// carries the `Error` marker. Transport failures are not retried.
    pub async fn register(
        &self,
        identity: &DeviceIdentity,
        installation_auth: &str,
        app: &AppIdentity,
    ) -> Result<String> {
        for attempt in 1..=REGISTER_MAX_ATTEMPTS {
            let body = self.attempt(identity, installation_auth, app).await?;

            if body.contains("Error") {
                log::warn!(
                    "[Register] attempt {attempt}/{REGISTER_MAX_ATTEMPTS} failed: {}",
                    body.trim()
                );
                if attempt < REGISTER_MAX_ATTEMPTS {
                    log::warn!("[Register] retrying in {REGISTER_RETRY_DELAY:?}");
                    sleep(REGISTER_RETRY_DELAY).await;
                }
                continue;
            }

            let token = extract_token(&body)?;
            log::info!("[Register] got push token ({} chars)", token.len());
            return Ok(token);
        }

        Err(Error::Registration)
    }

    /// One registration request; returns the raw response body.
    async fn attempt(
        &self,
        identity: &DeviceIdentity,
        installation_auth: &str,
        app: &AppIdentity,
    ) -> Result<String> {
        let form: [(&str, &str); 11] = [
            ("app", &app.package_name),
            ("X-subtype", &app.sender_id),
            ("device", &identity.android_id),
            ("sender", &app.sender_id),
            ("X-scope", "*"),
            ("X-Goog-Firebase-Installations-Auth", installation_auth),
            ("X-gmp_app_id", &app.app_id),
            ("X-cliv", "fiid-21.1.1"),
            ("cert", &app.package_certificate),
            ("gcm_ver", "220217"),
            ("plat", "0"),
        ];

        let response = self
            .http
            .post(&self.url)
            .header(
                "Authorization",
                format!(
                    "AidLogin {}:{}",
                    identity.android_id, identity.security_token
                ),
            )
            .form(&form)
            .send()
            .await?;

        Ok(response.text().await?)
    }
}

/// Extract the push token from a success body shaped like `token=<value>`.
///
/// Everything after the first `=` is the token; this parsing is a
/// compatibility contract with the service and must not get stricter. A
/// body with no `=` at all is reported as a malformed response rather
/// than returned as a token.
fn extract_token(body: &str) -> Result<String> {
    match body.split_once('=') {
        Some((_, token)) => Ok(token.to_string()),
        None => Err(Error::Network(format!(
            "registration response carried no token field: {}",
            body.trim()
        ))),
    }
}

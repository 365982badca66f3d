//! End-to-end registration flow.
//!
//! Sequences the whole `fcm-register` run in strict order: installation
//! auth → device check-in → push registration → token bridge → pairing →
//! companion registration → persisted bundle. Every step feeds the next
//! and any failure aborts the run; a failed run restarts from the
//! beginning rather than resuming.

use serde_json::json;

use crate::checkin::CheckinClient;
use crate::config::ConfigFile;
use crate::constants::{self, HTTP_REQUEST_TIMEOUT};
use crate::credentials::{AppIdentity, CredentialBundle, FcmRegistration, PushCredential};
use crate::error::Result;
use crate::exchange::ExchangeClient;
use crate::installations::InstallationsClient;
use crate::pairing::PairingSession;
use crate::register::RegistrationClient;

/// Service endpoints consumed by a registration run.
///
/// Defaults to the real vendor services; tests point the whole struct at
/// a local fixture server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Device check-in service.
    pub checkin_url: String,
    /// Installations service base (`.../v1`).
    pub installations_base_url: String,
    /// Push registration service.
    pub register_url: String,
    /// Expo token bridge.
    pub expo_url: String,
    /// Companion registration endpoint.
    pub companion_register_url: String,
    /// Companion login page for pairing.
    pub companion_login_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            checkin_url: constants::CHECKIN_URL.to_string(),
            installations_base_url: constants::INSTALLATIONS_BASE_URL.to_string(),
            register_url: constants::REGISTER_URL.to_string(),
            expo_url: constants::EXPO_TOKEN_URL.to_string(),
            companion_register_url: constants::COMPANION_REGISTER_URL.to_string(),
            companion_login_url: constants::COMPANION_LOGIN_URL.to_string(),
        }
    }
}

/// Owns one registration run end to end.
#[derive(Debug)]
pub struct Orchestrator {
    http: reqwest::Client,
    endpoints: Endpoints,
    app: AppIdentity,
    config: ConfigFile,
    host: String,
    no_launch: bool,
}

impl Orchestrator {
    /// Build an orchestrator for the companion app against the default
    /// endpoints.
    pub fn new(config: ConfigFile, host: impl Into<String>, no_launch: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoints: Endpoints::default(),
            app: AppIdentity::rust_companion(),
            config,
            host: host.into(),
            no_launch,
        })
    }

    /// Override the consumed endpoints (used by tests and forks).
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Run the full registration flow, binding a fresh pairing session.
    pub async fn run(&self) -> Result<CredentialBundle> {
        let (credential, bridged_token) = self.register_push().await?;
        let session =
            PairingSession::bind(&self.host, &self.endpoints.companion_login_url).await?;
        self.finish(credential, bridged_token, session).await
    }

    /// Run the full flow against a pre-bound pairing session.
    ///
    /// This is the seam the integration tests use when they need the
    /// session's address before the wait starts.
    pub async fn run_with_session(&self, session: PairingSession) -> Result<CredentialBundle> {
        let (credential, bridged_token) = self.register_push().await?;
        self.finish(credential, bridged_token, session).await
    }

    /// Steps 1-4: installation auth, check-in, registration, bridge.
    async fn register_push(&self) -> Result<(PushCredential, String)> {
        println!("Requesting installation auth...");
        let installations =
            InstallationsClient::new(self.http.clone(), &self.endpoints.installations_base_url);
        let installation_auth = installations.install(&self.app).await?;

        println!("Checking in device...");
        let checkin = CheckinClient::new(self.http.clone(), &self.endpoints.checkin_url);
        let identity = checkin.check_in().await?;

        println!("Registering for push notifications...");
        let registration = RegistrationClient::new(self.http.clone(), &self.endpoints.register_url);
        let push_token = registration
            .register(&identity, &installation_auth, &self.app)
            .await?;

        println!("Exchanging push token...");
        let exchange = self.exchange_client();
        let bridged_token = exchange
            .exchange_for_bridged_token(&self.app, &push_token)
            .await?;

        let credential = PushCredential {
            gcm: identity,
            fcm: FcmRegistration { token: push_token },
        };
        Ok((credential, bridged_token))
    }

    /// Steps 5-7: pairing wait, companion registration, persistence.
    async fn finish(
        &self,
        credential: PushCredential,
        bridged_token: String,
        mut session: PairingSession,
    ) -> Result<CredentialBundle> {
        announce(&session);
        session.launch_browser(self.no_launch);

        let auth_token = session.wait().await?;
        log::info!(
            "[Register] pairing resolved (token {} chars, prefix {:?})",
            auth_token.len(),
            &auth_token[..auth_token.len().min(6)]
        );

        println!("Registering with the companion server...");
        self.exchange_client()
            .finalize_registration(&auth_token, &bridged_token)
            .await?;

        let bundle = CredentialBundle {
            fcm_credentials: credential,
            expo_push_token: bridged_token,
            rustplus_auth_token: auth_token,
        };
        self.config.save_bundle(&bundle)?;

        println!("Registration complete. Credentials saved to {}.", self.config.path().display());
        Ok(bundle)
    }

    /// Run only the pairing step and persist the resulting auth token.
    ///
    /// Used by `pair-open`; `login_url` overrides the companion login
    /// page when set.
    pub async fn pair_only(&self, login_url: Option<&str>) -> Result<String> {
        let login_url = login_url.unwrap_or(&self.endpoints.companion_login_url);
        let mut session = PairingSession::bind(&self.host, login_url).await?;

        announce(&session);
        session.launch_browser(self.no_launch);

        let auth_token = session.wait().await?;
        self.config
            .merge_write(json!({ "rustplus_auth_token": &auth_token }))?;

        println!("Pairing complete. Token saved to {}.", self.config.path().display());
        Ok(auth_token)
    }

    fn exchange_client(&self) -> ExchangeClient {
        ExchangeClient::new(
            self.http.clone(),
            &self.endpoints.expo_url,
            &self.endpoints.companion_register_url,
        )
    }
}

/// Print the pairing instructions for users who have to browse manually.
fn announce(session: &PairingSession) {
    println!();
    println!("  Pairing listener ready. If no browser opens, visit:");
    println!();
    println!("    {}", session.base_url());
    println!();
    println!("  and follow the instructions there.");
    println!();
}

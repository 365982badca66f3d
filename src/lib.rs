//! rustplus-pair - FCM registration and companion pairing for Rust+.
//!
//! Links a third-party client to the Rust+ companion push channel so it
//! can receive server-pushed pairing notifications without running its
//! own server.
//!
//! # Flow
//!
//! - [`installations`] - installation-scoped auth token (fresh FID per run)
//! - [`checkin`] - Android device check-in (android id + security token)
//! - [`register`] - push registration with bounded retry
//! - [`exchange`] - Expo token bridge and companion registration
//! - [`pairing`] - single-use local listener for the browser auth hop
//! - [`orchestrator`] - sequences the above and persists the bundle
//!
//! The long-lived push listener's wire protocol is out of scope; its
//! interface boundary lives in [`listener`].

// Library modules
pub mod browser;
pub mod checkin;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod installations;
pub mod listener;
pub mod orchestrator;
pub mod pairing;
pub mod register;

// Re-export commonly used types
pub use config::ConfigFile;
pub use credentials::{parse_credential_record, AppIdentity, CredentialBundle, DeviceIdentity};
pub use error::{Error, Result};
pub use orchestrator::{Endpoints, Orchestrator};
pub use pairing::PairingSession;

//! rustplus-pair CLI - registers with FCM and pairs with the Rust+
//! companion server.
//!
//! This is the thin dispatcher; the flows live in the `rustplus_pair`
//! library.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rustplus_pair::listener::{run_listener, StubTransport};
use rustplus_pair::{parse_credential_record, ConfigFile, DeviceIdentity, Orchestrator};

// CLI
#[derive(Parser)]
#[command(name = "rustplus-pair")]
#[command(version)]
#[command(about = "FCM registration and pairing for the Rust+ companion push channel")]
struct Cli {
    /// Path of the JSON credential bundle.
    #[arg(long = "config-file", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register with FCM, pair in the browser, and save the credential bundle
    FcmRegister {
        /// Interface the pairing listener binds to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Do not try to open a local browser.
        #[arg(long)]
        no_launch: bool,
    },
    /// Listen for push notifications with saved credentials
    FcmListen {
        /// Credential record, e.g. '{androidId:...,securityToken:...}'.
        /// Defaults to the saved bundle.
        #[arg(long = "dataRust")]
        data_rust: Option<String>,
    },
    /// Open the companion pairing page against a local callback listener
    PairOpen {
        /// Override the companion login page URL.
        #[arg(long)]
        url: Option<String>,
        /// Interface the pairing listener binds to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Do not try to open a local browser.
        #[arg(long)]
        no_launch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config_file);

    match cli.command {
        Commands::FcmRegister { host, no_launch } => {
            let orchestrator = Orchestrator::new(config, host, no_launch)?;
            orchestrator.run().await?;
        }
        Commands::FcmListen { data_rust } => {
            let identity = resolve_identity(&config, data_rust.as_deref())?;
            run_listener(&StubTransport, &identity, &config).await?;
        }
        Commands::PairOpen {
            url,
            host,
            no_launch,
        } => {
            let orchestrator = Orchestrator::new(config, host, no_launch)?;
            orchestrator.pair_only(url.as_deref()).await?;
        }
    }

    Ok(())
}

/// Resolve the config file path: `--config-file` wins, then the
/// `RUSTPLUS_CONFIG_FILE` env var, then the working-directory default.
fn resolve_config(flag: Option<PathBuf>) -> ConfigFile {
    match flag {
        Some(path) => ConfigFile::new(path),
        None => match std::env::var("RUSTPLUS_CONFIG_FILE") {
            Ok(path) => ConfigFile::new(path),
            Err(_) => ConfigFile::default(),
        },
    }
}

/// Resolve the device identity for `fcm-listen`.
///
/// A `--dataRust` record wins; otherwise the saved bundle is used. Either
/// way the identity passes through the codec's digit-string validation.
fn resolve_identity(config: &ConfigFile, data_rust: Option<&str>) -> Result<DeviceIdentity> {
    match data_rust {
        Some(record) => Ok(parse_credential_record(record)?),
        None => {
            let credential = config
                .load_push_credential()?
                .context("no fcm_credentials in config; run fcm-register first")?;
            Ok(DeviceIdentity::new(
                credential.gcm.android_id,
                credential.gcm.security_token,
            )?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_identity_prefers_data_rust() {
        let config = ConfigFile::new("/nonexistent/config.json");
        let identity =
            resolve_identity(&config, Some("{androidId:1,securityToken:2}")).unwrap();
        assert_eq!(identity.android_id, "1");
        assert_eq!(identity.security_token, "2");
    }

    #[test]
    fn test_resolve_identity_without_config_fails() {
        let config = ConfigFile::new("/nonexistent/config.json");
        assert!(resolve_identity(&config, None).is_err());
    }
}

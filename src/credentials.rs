//! Device credential records and the codec that parses them.
//!
//! The check-in service hands out an android id and a security token as
//! integers that overflow double-precision floats, so both travel through
//! this crate as exact digit strings and are never parsed into numbers.
//! [`DeviceIdentity::new`] enforces that invariant; everything that builds
//! an identity, including the record codec, goes through it.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Error, Result};

/// Device identity issued by check-in: android id + security token.
///
/// Serializes with the upstream field names so the persisted bundle and
/// the credential-record format agree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Exact digit string of the android id.
    #[serde(rename = "androidId")]
    pub android_id: String,
    /// Exact digit string of the security token.
    #[serde(rename = "securityToken")]
    pub security_token: String,
}

impl DeviceIdentity {
    /// Build an identity, rejecting anything that is not a pure digit run.
    pub fn new(android_id: impl Into<String>, security_token: impl Into<String>) -> Result<Self> {
        let android_id = android_id.into();
        let security_token = security_token.into();
        for (name, value) in [("androidId", &android_id), ("securityToken", &security_token)] {
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::Format(format!("{name} is not a digit string")));
            }
        }
        Ok(Self {
            android_id,
            security_token,
        })
    }
}

/// Fixed client identity of the companion app, threaded through the
/// installation, registration, and bridge calls.
#[derive(Clone, Debug)]
pub struct AppIdentity {
    /// Firebase web API key.
    pub api_key: String,
    /// Firebase project id.
    pub project_id: String,
    /// Firebase app id.
    pub app_id: String,
    /// GCM sender id.
    pub sender_id: String,
    /// Android package name.
    pub package_name: String,
    /// Android package signing certificate (SHA-1).
    pub package_certificate: String,
}

impl AppIdentity {
    /// The Rust+ companion app's published identity.
    pub fn rust_companion() -> Self {
        Self {
            api_key: constants::COMPANION_API_KEY.to_string(),
            project_id: constants::COMPANION_PROJECT_ID.to_string(),
            app_id: constants::COMPANION_APP_ID.to_string(),
            sender_id: constants::COMPANION_SENDER_ID.to_string(),
            package_name: constants::COMPANION_PACKAGE_NAME.to_string(),
            package_certificate: constants::COMPANION_PACKAGE_CERT.to_string(),
        }
    }
}

/// FCM registration result: the push token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FcmRegistration {
    /// Vendor-issued push token.
    pub token: String,
}

/// Push credential bundle as persisted under `fcm_credentials`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushCredential {
    /// Device identity from check-in.
    pub gcm: DeviceIdentity,
    /// Registration token.
    pub fcm: FcmRegistration,
}

/// The full persisted credential bundle written by a registration run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    /// Push credentials (device identity + push token).
    pub fcm_credentials: PushCredential,
    /// Bridged Expo push token.
    pub expo_push_token: String,
    /// User authorization token from pairing.
    pub rustplus_auth_token: String,
}

// The value must run to a record delimiter so a partial digit prefix of a
// non-digit value (e.g. `0xdead`) never matches.
static ANDROID_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?androidId["']?\s*:\s*["']?([0-9]+)["']?\s*[,}]"#).expect("static pattern")
});

static SECURITY_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?securityToken["']?\s*:\s*["']?([0-9]+)["']?\s*[,}]"#)
        .expect("static pattern")
});

/// Parse a loosely formatted credential record into a [`DeviceIdentity`].
///
/// Accepts a brace-delimited record containing `androidId` and
/// `securityToken` in either order, with or without quotes, e.g.
/// `{androidId:123,securityToken:"456"}`. Values are captured as
/// contiguous digit runs so no precision is ever lost to number parsing.
pub fn parse_credential_record(input: &str) -> Result<DeviceIdentity> {
    let record = input.trim();
    if !record.starts_with('{') || !record.ends_with('}') {
        return Err(Error::Format(
            "expected a brace-delimited record like {androidId:...,securityToken:...}".to_string(),
        ));
    }

    let android_id = ANDROID_ID_RE
        .captures(record)
        .map(|caps| caps[1].to_string());
    let security_token = SECURITY_TOKEN_RE
        .captures(record)
        .map(|caps| caps[1].to_string());

    match (android_id, security_token) {
        (Some(id), Some(token)) => DeviceIdentity::new(id, token),
        (id, token) => {
            let mut missing = Vec::new();
            if id.is_none() {
                missing.push("androidId");
            }
            if token.is_none() {
                missing.push("securityToken");
            }
            Err(Error::Format(format!(
                "missing key(s): {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unquoted_record() {
        let identity = parse_credential_record("{androidId:123456789,securityToken:987654321}")
            .expect("should parse");
        assert_eq!(identity.android_id, "123456789");
        assert_eq!(identity.security_token, "987654321");
    }

    #[test]
    fn test_parse_quoted_and_reordered() {
        let identity = parse_credential_record(
            r#"{ "securityToken": "18446744073709551615", "androidId": "5233965549695570802" }"#,
        )
        .expect("should parse");
        assert_eq!(identity.security_token, "18446744073709551615");
        assert_eq!(identity.android_id, "5233965549695570802");
    }

    #[test]
    fn test_parse_preserves_exact_digits() {
        // Larger than 2^53: the digits must survive untouched
        let identity =
            parse_credential_record("{androidId:9007199254740993,securityToken:9007199254740995}")
                .expect("should parse");
        assert_eq!(identity.android_id, "9007199254740993");
        assert_eq!(identity.security_token, "9007199254740995");
    }

    #[test]
    fn test_parse_rejects_missing_braces() {
        let err = parse_credential_record("androidId:1,securityToken:2").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert!(matches!(
            parse_credential_record(""),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_parse_names_missing_keys() {
        let err = parse_credential_record("{androidId:123}").unwrap_err();
        match err {
            Error::Format(msg) => assert!(msg.contains("securityToken"), "got: {msg}"),
            other => panic!("expected Format error, got {other:?}"),
        }

        let err = parse_credential_record("{}").unwrap_err();
        match err {
            Error::Format(msg) => {
                assert!(msg.contains("androidId") && msg.contains("securityToken"))
            }
            other => panic!("expected Format error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_non_digit_value() {
        // A hex value never matches the digit capture, so the key counts as missing
        let err = parse_credential_record("{androidId:0xdead,securityToken:2}").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_identity_constructor_enforces_digits() {
        assert!(DeviceIdentity::new("123", "456").is_ok());
        assert!(DeviceIdentity::new("", "456").is_err());
        assert!(DeviceIdentity::new("12a", "456").is_err());
        assert!(DeviceIdentity::new("123", "45 6").is_err());
    }

    #[test]
    fn test_bundle_serialization_shape() {
        let bundle = CredentialBundle {
            fcm_credentials: PushCredential {
                gcm: DeviceIdentity::new("100", "200").unwrap(),
                fcm: FcmRegistration {
                    token: "PUSH1".to_string(),
                },
            },
            expo_push_token: "EXPO1".to_string(),
            rustplus_auth_token: "AUTH1".to_string(),
        };

        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["fcm_credentials"]["gcm"]["androidId"], "100");
        assert_eq!(value["fcm_credentials"]["gcm"]["securityToken"], "200");
        assert_eq!(value["fcm_credentials"]["fcm"]["token"], "PUSH1");
        assert_eq!(value["expo_push_token"], "EXPO1");
        assert_eq!(value["rustplus_auth_token"], "AUTH1");
    }
}

//! Credential bundle persistence.
//!
//! The bundle lives in a plain JSON file (default `rustplus.config.json`
//! in the working directory, overridable with `--config-file`). Writes
//! merge into whatever is already there: new top-level fields overwrite
//! same-named old ones, unrelated fields survive. The file is
//! pretty-printed so users can read and hand-edit it.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::credentials::{CredentialBundle, PushCredential};
use crate::error::{Error, Result};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rustplus.config.json";

/// Handle to the persisted JSON config.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

impl ConfigFile {
    /// Use the config at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole config object. A missing file reads as `{}`.
    pub fn read(&self) -> Result<Value> {
        if !self.path.exists() {
            return Ok(Value::Object(Map::new()));
        }
        let content = fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{} is not valid JSON: {e}", self.path.display())))?;
        match value {
            Value::Object(_) => Ok(value),
            _ => Err(Error::Config(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    /// Merge `updates` into the existing config and write it back,
    /// pretty-printed. Only top-level keys named in `updates` are
    /// replaced.
    pub fn merge_write(&self, updates: Value) -> Result<()> {
        let Value::Object(updates) = updates else {
            return Err(Error::Config("merge payload must be a JSON object".to_string()));
        };

        let mut config = self.read()?;
        let object = config
            .as_object_mut()
            .expect("read() only returns objects");
        for (key, value) in updates {
            object.insert(key, value);
        }

        fs::write(&self.path, serde_json::to_string_pretty(&config)?)?;
        log::info!("[Config] wrote {}", self.path.display());
        Ok(())
    }

    /// Persist a registration run's credential bundle.
    pub fn save_bundle(&self, bundle: &CredentialBundle) -> Result<()> {
        self.merge_write(serde_json::to_value(bundle)?)
    }

    /// Load the saved push credential, if a registration ran before.
    pub fn load_push_credential(&self) -> Result<Option<PushCredential>> {
        let config = self.read()?;
        match config.get("fcm_credentials") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let credential = serde_json::from_value(value.clone()).map_err(|e| {
                    Error::Config(format!("fcm_credentials has an unexpected shape: {e}"))
                })?;
                Ok(Some(credential))
            }
        }
    }

    /// Notification ids already seen by the listener.
    pub fn persistent_ids(&self) -> Result<Vec<String>> {
        let config = self.read()?;
        match config.get("persistent_ids") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::Config(format!("persistent_ids has an unexpected shape: {e}"))),
        }
    }

    /// Record one more seen notification id.
    pub fn append_persistent_id(&self, id: &str) -> Result<()> {
        let mut ids = self.persistent_ids()?;
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
        self.merge_write(serde_json::json!({ "persistent_ids": ids }))
    }
}

// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loaded from `~/.votegate/config.json`.
//!
//! A missing file means defaults. The privileged secret can be supplied via
//! `VOTEGATE_ADMIN_SECRET` instead of being written to disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::credentials::DEFAULT_MIN_SECRET_LEN;
use crate::auth::{
    AuthController, ClassConfigs, Classifier, LockoutConfig, MockCredentialValidator,
};
use crate::store::{FileStore, KeyValueStore};

/// Environment variable overriding `privileged_secret`.
pub const ADMIN_SECRET_ENV: &str = "VOTEGATE_ADMIN_SECRET";

pub const DEFAULT_PRIVILEGED_IDENTIFIER: &str = "admin@votegate.local";

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identifier that maps to the privileged class (case-insensitive).
    #[serde(default = "default_privileged_identifier")]
    pub privileged_identifier: String,

    /// Secret for the privileged identifier. `None` disables privileged logins.
    #[serde(default)]
    pub privileged_secret: Option<String>,

    #[serde(default = "LockoutConfig::privileged_default")]
    pub privileged_lockout: LockoutConfig,

    #[serde(default = "LockoutConfig::standard_default")]
    pub standard_lockout: LockoutConfig,

    /// Store location (default `~/.votegate/store.json`).
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    #[serde(default = "default_min_secret_len")]
    pub min_secret_len: usize,
}

fn default_privileged_identifier() -> String {
    DEFAULT_PRIVILEGED_IDENTIFIER.to_string()
}

fn default_min_secret_len() -> usize {
    DEFAULT_MIN_SECRET_LEN
}

impl Default for Config {
    fn default() -> Self {
        Self {
            privileged_identifier: default_privileged_identifier(),
            privileged_secret: None,
            privileged_lockout: LockoutConfig::privileged_default(),
            standard_lockout: LockoutConfig::standard_default(),
            store_path: None,
            min_secret_len: DEFAULT_MIN_SECRET_LEN,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("privileged_identifier", &self.privileged_identifier)
            .field("privileged_secret", &self.privileged_secret.as_ref().map(|_| "<redacted>"))
            .field("privileged_lockout", &self.privileged_lockout)
            .field("standard_lockout", &self.standard_lockout)
            .field("store_path", &self.store_path)
            .field("min_secret_len", &self.min_secret_len)
            .finish()
    }
}

impl Config {
    /// `~/.votegate`
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".votegate")
    }

    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Load from `path`, falling back to defaults when the file is absent,
    /// then apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            tracing::debug!(?path, "No config file, using defaults");
            Config::default()
        };

        if let Ok(secret) = std::env::var(ADMIN_SECRET_ENV) {
            if !secret.is_empty() {
                config.privileged_secret = Some(secret);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write config: {:?}", path))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.class_configs().validate()?;
        anyhow::ensure!(
            crate::auth::is_valid_identifier(&self.privileged_identifier),
            "privileged_identifier {:?} is not a valid email address",
            self.privileged_identifier
        );
        anyhow::ensure!(self.min_secret_len >= 1, "min_secret_len must be at least 1");
        Ok(())
    }

    pub fn class_configs(&self) -> ClassConfigs {
        ClassConfigs {
            privileged: self.privileged_lockout,
            standard: self.standard_lockout,
        }
    }

    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(FileStore::default_path)
    }

    pub fn validator(&self) -> MockCredentialValidator {
        MockCredentialValidator::new(
            Classifier::new(&self.privileged_identifier),
            self.privileged_secret.clone(),
        )
    }

    /// Controller wired to `store` with this configuration.
    pub fn build_controller(&self, store: Arc<dyn KeyValueStore>) -> AuthController {
        AuthController::new(store, self.validator(), self.class_configs())
            .with_min_secret_len(self.min_secret_len)
    }
}

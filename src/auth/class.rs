// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Account classes and their lockout configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Privileged accounts: 5 attempts per 5-minute window.
pub const PRIVILEGED_MAX_ATTEMPTS: u32 = 5;
pub const PRIVILEGED_WINDOW_MS: u64 = 5 * 60 * 1000;

/// Standard accounts: 3 attempts per 15-minute window.
pub const STANDARD_MAX_ATTEMPTS: u32 = 3;
pub const STANDARD_WINDOW_MS: u64 = 15 * 60 * 1000;

/// Which lockout policy and credential path a submission takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountClass {
    Privileged,
    Standard,
}

impl AccountClass {
    pub const ALL: [AccountClass; 2] = [AccountClass::Privileged, AccountClass::Standard];

    /// Prefix used for this class's keys in the persistent store.
    pub fn storage_prefix(&self) -> &'static str {
        match self {
            AccountClass::Privileged => "admin",
            AccountClass::Standard => "user",
        }
    }
}

impl std::fmt::Display for AccountClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountClass::Privileged => write!(f, "PRIVILEGED"),
            AccountClass::Standard => write!(f, "STANDARD"),
        }
    }
}

/// Which failed attempt the lockout window is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    /// Every failure restarts the window.
    #[default]
    LastFailure,
    /// The window runs from the first failure since the last reset.
    FirstFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockoutConfigError {
    #[error("{class} lockout: max_attempts must be at least 1")]
    ZeroAttempts { class: AccountClass },
    #[error("{class} lockout: window_ms must be greater than 0")]
    ZeroWindow { class: AccountClass },
}

/// Attempt budget for one account class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutConfig {
    pub max_attempts: u32,
    pub window_ms: u64,
    #[serde(default)]
    pub anchor: WindowAnchor,
}

impl LockoutConfig {
    pub fn new(max_attempts: u32, window_ms: u64) -> Self {
        Self {
            max_attempts,
            window_ms,
            anchor: WindowAnchor::LastFailure,
        }
    }

    pub fn privileged_default() -> Self {
        Self::new(PRIVILEGED_MAX_ATTEMPTS, PRIVILEGED_WINDOW_MS)
    }

    pub fn standard_default() -> Self {
        Self::new(STANDARD_MAX_ATTEMPTS, STANDARD_WINDOW_MS)
    }

    pub fn with_anchor(mut self, anchor: WindowAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn validate(&self, class: AccountClass) -> Result<(), LockoutConfigError> {
        if self.max_attempts == 0 {
            return Err(LockoutConfigError::ZeroAttempts { class });
        }
        if self.window_ms == 0 {
            return Err(LockoutConfigError::ZeroWindow { class });
        }
        Ok(())
    }
}

/// Lockout configuration for both classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConfigs {
    pub privileged: LockoutConfig,
    pub standard: LockoutConfig,
}

impl Default for ClassConfigs {
    fn default() -> Self {
        Self {
            privileged: LockoutConfig::privileged_default(),
            standard: LockoutConfig::standard_default(),
        }
    }
}

impl ClassConfigs {
    pub fn for_class(&self, class: AccountClass) -> &LockoutConfig {
        match class {
            AccountClass::Privileged => &self.privileged,
            AccountClass::Standard => &self.standard,
        }
    }

    pub fn validate(&self) -> Result<(), LockoutConfigError> {
        self.privileged.validate(AccountClass::Privileged)?;
        self.standard.validate(AccountClass::Standard)
    }
}

// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Credential checks: input shape, class dispatch, and the validator seam.
//!
//! [`MockCredentialValidator`] is the only validator shipped. It checks the
//! privileged pair from configuration and accepts any well-formed standard
//! login. A deployment with a real account database plugs its own
//! [`CredentialValidator`] into the controller.

use std::sync::LazyLock;

use regex::Regex;
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::class::AccountClass;
use crate::error::ValidationError;

/// Default minimum secret length.
pub const DEFAULT_MIN_SECRET_LEN: usize = 8;

/// `local@domain.tld`, no whitespace, exactly one `@` boundary per part.
/// JUSTIFICATION for .expect(): static pattern, validated by the tests below.
static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("identifier regex is valid")
});

/// Structural check on the identifier (email-like).
pub fn is_valid_identifier(identifier: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(identifier)
}

/// Shape checks that run before any lockout or credential logic.
///
/// Order matters: missing fields, then identifier format, then secret length.
pub fn check_input_shape(
    identifier: &str,
    secret: &str,
    min_secret_len: usize,
) -> Result<(), ValidationError> {
    if identifier.is_empty() || secret.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if !is_valid_identifier(identifier) {
        return Err(ValidationError::InvalidFormat);
    }
    if secret.chars().count() < min_secret_len {
        return Err(ValidationError::WeakSecret {
            min_len: min_secret_len,
        });
    }
    Ok(())
}

/// Maps identifiers onto account classes.
///
/// The privileged identifier is injected, never hardcoded in the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    privileged_identifier: String,
}

impl Classifier {
    pub fn new(privileged_identifier: impl Into<String>) -> Self {
        Self {
            privileged_identifier: privileged_identifier.into().to_lowercase(),
        }
    }

    /// Case-insensitive match against the privileged identifier.
    pub fn classify(&self, identifier: &str) -> AccountClass {
        if identifier.to_lowercase() == self.privileged_identifier {
            AccountClass::Privileged
        } else {
            AccountClass::Standard
        }
    }
}

/// Failure of the credential backend itself (not a wrong password).
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("credential backend unavailable: {0}")]
    Unavailable(String),
}

/// Capability that decides whether a credential pair is genuine.
pub trait CredentialValidator: Send + Sync {
    fn classify(&self, identifier: &str) -> AccountClass;

    /// `Ok(false)` is a wrong credential; `Err` means the check could not run.
    fn validate(
        &self,
        identifier: &str,
        secret: &str,
        class: AccountClass,
    ) -> Result<bool, ValidatorError>;
}

/// Placeholder validator with no account database behind it.
#[derive(Clone)]
pub struct MockCredentialValidator {
    classifier: Classifier,
    privileged_secret: Option<String>,
}

impl std::fmt::Debug for MockCredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCredentialValidator")
            .field("classifier", &self.classifier)
            .field("privileged_secret", &self.privileged_secret.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl MockCredentialValidator {
    /// With `privileged_secret = None` every privileged login fails.
    pub fn new(classifier: Classifier, privileged_secret: Option<String>) -> Self {
        Self {
            classifier,
            privileged_secret,
        }
    }
}

impl CredentialValidator for MockCredentialValidator {
    fn classify(&self, identifier: &str) -> AccountClass {
        self.classifier.classify(identifier)
    }

    fn validate(
        &self,
        identifier: &str,
        secret: &str,
        class: AccountClass,
    ) -> Result<bool, ValidatorError> {
        match class {
            AccountClass::Privileged => {
                let Some(expected) = self.privileged_secret.as_deref() else {
                    tracing::warn!(
                        "Privileged login attempted but no privileged secret is configured"
                    );
                    return Ok(false);
                };
                let identity_ok = self.classifier.classify(identifier) == AccountClass::Privileged;
                let secret_ok: bool = secret.as_bytes().ct_eq(expected.as_bytes()).into();
                Ok(identity_ok && secret_ok)
            }
            AccountClass::Standard => Ok(is_valid_identifier(identifier) && !secret.is_empty()),
        }
    }
}

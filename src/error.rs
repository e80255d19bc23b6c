// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error taxonomy for login submissions.
//!
//! | Kind | Consumes an attempt | Persistent side effect |
//! |---|---|---|
//! | [`ValidationError`] | no | none |
//! | [`AuthError::LockedOut`] | no | none |
//! | [`CredentialError`] | yes | counter incremented |
//! | [`AuthError::Internal`] | n/a | whatever the store managed to do |
//!
//! Internal failures never reach the user with details attached. They carry a
//! reference code (`ERR-YYYYMMDD-XXXXXX`) and the details go to the log under
//! the same code.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::policy::RemainingTime;

/// Input shape problems. Checked before anything touches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Please enter a valid email address")]
    InvalidFormat,
    #[error("Password must be at least {min_len} characters long")]
    WeakSecret { min_len: usize },
}

/// Wrong credentials. Admin and voter paths get distinct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CredentialError {
    #[error("Voter authentication failed")]
    InvalidCredentials,
    #[error("Invalid admin credentials")]
    InvalidAdminCredentials,
}

/// Why a submission was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    Validation(ValidationError),
    Credential(CredentialError),
    /// Store or validator failure. Never treated as success or lockout.
    Internal { reference: String },
}

impl RejectReason {
    /// Build an internal rejection, logging `details` under a fresh reference code.
    pub fn internal(details: &dyn std::fmt::Display) -> Self {
        let reference = generate_reference_code();
        tracing::error!(
            reference = %reference,
            internal_error = %details,
            "Login submission failed internally"
        );
        RejectReason::Internal { reference }
    }

    pub fn message(&self) -> String {
        match self {
            RejectReason::Validation(e) => e.to_string(),
            RejectReason::Credential(e) => e.to_string(),
            RejectReason::Internal { reference } => format!(
                "An error occurred during login. Please try again. (Reference: {})",
                reference
            ),
        }
    }
}

/// Error form of a non-successful outcome, for callers that want `?`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Account temporarily locked due to too many failed attempts. Please try again in {remaining}.")]
    LockedOut { remaining: RemainingTime },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("An error occurred during login. Please try again. (Reference: {reference})")]
    Internal { reference: String },
}

impl From<RejectReason> for AuthError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::Validation(e) => AuthError::Validation(e),
            RejectReason::Credential(e) => AuthError::Credential(e),
            RejectReason::Internal { reference } => AuthError::Internal { reference },
        }
    }
}

/// Reference code alphabet, without `0`/`O` and `1`/`I`.
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERENCE_SUFFIX_LEN: usize = 6;

/// Support reference for an internal failure: `ERR-YYYYMMDD-XXXXXX`.
pub fn generate_reference_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERENCE_SUFFIX_LEN)
        .map(|_| char::from(REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())]))
        .collect();
    format!("ERR-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

/// Formats a CLI error with title, causes, and fixes.
pub fn format_error(title: &str, causes: &[&str], fixes: &[&str]) -> String {
    let mut output = format!("[✗] {}\n", title);

    if !causes.is_empty() {
        output.push_str("\nPossible causes:\n");
        for cause in causes {
            output.push_str(&format!("  - {}\n", cause));
        }
    }

    if !fixes.is_empty() {
        output.push_str("\nTry these fixes:\n");
        for (i, fix) in fixes.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, fix));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(ValidationError::MissingFields.to_string(), "Please fill in all fields");
        assert_eq!(
            ValidationError::InvalidFormat.to_string(),
            "Please enter a valid email address"
        );
        assert_eq!(
            ValidationError::WeakSecret { min_len: 8 }.to_string(),
            "Password must be at least 8 characters long"
        );
    }

    #[test]
    fn test_reference_code_format() {
        let code = generate_reference_code();
        assert!(code.starts_with("ERR-"));
        assert_eq!(code.len(), "ERR-20240115-A3F8K2".len());
        let suffix = &code[code.len() - REFERENCE_SUFFIX_LEN..];
        assert!(suffix.bytes().all(|b| REFERENCE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_internal_reason_hides_details() {
        let reason = RejectReason::internal(&"disk at /root/.votegate/store.json is read-only");
        let message = reason.message();
        assert!(message.starts_with("An error occurred during login"));
        assert!(message.contains("ERR-"));
        assert!(!message.contains("/root"));
    }

    #[test]
    fn test_locked_out_message() {
        let err = AuthError::LockedOut {
            remaining: RemainingTime::new(897_000),
        };
        assert_eq!(
            err.to_string(),
            "Account temporarily locked due to too many failed attempts. \
             Please try again in 15 minutes and 57 seconds."
        );
    }

    #[test]
    fn test_reject_reason_into_auth_error() {
        let err: AuthError =
            RejectReason::Credential(CredentialError::InvalidAdminCredentials).into();
        assert_eq!(err.to_string(), "Invalid admin credentials");
    }

    #[test]
    fn test_format_error() {
        let error = format_error("Store unavailable", &["Disk full"], &["Free space"]);
        assert!(error.contains("[✗] Store unavailable"));
        assert!(error.contains("  - Disk full"));
        assert!(error.contains("  1. Free space"));

        let bare = format_error("Bare", &[], &[]);
        assert!(!bare.contains("Possible causes:"));
    }
}

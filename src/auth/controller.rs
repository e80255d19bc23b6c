// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Login state machine.
//!
//! One submission runs start to finish and yields exactly one [`AuthOutcome`]:
//!
//! ```text
//! Idle -> Validating -+-> Rejected(reason)
//!                     +-> LockedOut(remaining)
//!                     +-> Authenticated(role)
//! ```
//!
//! Steps, in order:
//!
//! 1. Shape checks (no attempt consumed).
//! 2. Classify the identifier.
//! 3. Evaluate the class's lockout; a locked class stops here untouched.
//! 4. Reset a stale record whose window has lapsed.
//! 5. Validate credentials; failure increments the class counter.
//! 6. Success establishes the session, then resets the counter.
//!
//! Store or validator failures become `Rejected(Internal)`. Nothing is retried.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use super::attempts::{AttemptRecord, AttemptStore};
use super::class::{AccountClass, ClassConfigs, WindowAnchor};
use super::credentials::{
    check_input_shape, CredentialValidator, ValidatorError, DEFAULT_MIN_SECRET_LEN,
};
use super::policy::{LockoutDecision, LockoutPolicy, RemainingTime};
use super::session::{subject_id_for, Role, SessionManager, SessionRecord};
use crate::error::{AuthError, CredentialError, RejectReason};
use crate::store::{KeyValueStore, StoreError, StoreResult};
use crate::utils::mask_sensitive;

/// Source of wall-clock milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// [`Clock`] reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Terminal state of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated { session: SessionRecord },
    Rejected(RejectReason),
    LockedOut { remaining: RemainingTime },
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated { .. })
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            AuthOutcome::Authenticated { session } => Some(session.role),
            _ => None,
        }
    }

    /// Human-readable message for display.
    pub fn message(&self) -> String {
        match self {
            AuthOutcome::Authenticated { session } => match session.role {
                Role::Admin => "Admin login successful".to_string(),
                Role::Voter => "Voter login successful".to_string(),
            },
            AuthOutcome::Rejected(reason) => reason.message(),
            AuthOutcome::LockedOut { remaining } => AuthError::LockedOut {
                remaining: *remaining,
            }
            .to_string(),
        }
    }

    pub fn into_result(self) -> Result<SessionRecord, AuthError> {
        match self {
            AuthOutcome::Authenticated { session } => Ok(session),
            AuthOutcome::Rejected(reason) => Err(reason.into()),
            AuthOutcome::LockedOut { remaining } => Err(AuthError::LockedOut { remaining }),
        }
    }
}

/// Anything below the state machine that can fail mid-submission.
#[derive(Debug, Error)]
enum SubmitFailure {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

/// Orchestrates the attempt ledger, lockout policy, validator and session.
pub struct AuthController {
    attempts: AttemptStore,
    sessions: SessionManager,
    validator: Box<dyn CredentialValidator>,
    configs: ClassConfigs,
    min_secret_len: usize,
    clock: Box<dyn Clock>,
}

impl AuthController {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        validator: impl CredentialValidator + 'static,
        configs: ClassConfigs,
    ) -> Self {
        Self {
            attempts: AttemptStore::new(store.clone()),
            sessions: SessionManager::new(store),
            validator: Box::new(validator),
            configs,
            min_secret_len: DEFAULT_MIN_SECRET_LEN,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_min_secret_len(mut self, min_secret_len: usize) -> Self {
        self.min_secret_len = min_secret_len;
        self
    }

    /// Run one submission at the clock's current time.
    pub fn submit(&self, identifier: &str, secret: &str) -> AuthOutcome {
        self.submit_at(identifier, secret, self.clock.now_ms())
    }

    /// Run one submission at `now_ms`.
    pub fn submit_at(&self, identifier: &str, secret: &str, now_ms: i64) -> AuthOutcome {
        if let Err(e) = check_input_shape(identifier, secret, self.min_secret_len) {
            tracing::debug!(reason = ?e, "Submission rejected before lockout check");
            return AuthOutcome::Rejected(RejectReason::Validation(e));
        }

        let class = self.validator.classify(identifier);
        match self.run(identifier, secret, class, now_ms) {
            Ok(outcome) => outcome,
            Err(failure) => AuthOutcome::Rejected(RejectReason::internal(&failure)),
        }
    }

    fn run(
        &self,
        identifier: &str,
        secret: &str,
        class: AccountClass,
        now_ms: i64,
    ) -> Result<AuthOutcome, SubmitFailure> {
        let config = self.configs.for_class(class);
        let mut record = self.attempts.get(class)?;

        match LockoutPolicy::evaluate(&record, config, now_ms) {
            LockoutDecision::Locked { remaining_ms } => {
                tracing::warn!(
                    class = %class,
                    attempt_count = record.attempt_count,
                    remaining_ms,
                    "Login refused: class is locked out"
                );
                return Ok(AuthOutcome::LockedOut {
                    remaining: RemainingTime::new(remaining_ms),
                });
            }
            LockoutDecision::Allowed { window_lapsed: true } if !record.is_clear() => {
                tracing::debug!(class = %class, "Lockout window lapsed, resetting attempts");
                self.attempts.reset(class)?;
                record = AttemptRecord::empty(class);
            }
            LockoutDecision::Allowed { .. } => {}
        }

        if !self.validator.validate(identifier, secret, class)? {
            let failed_at = match config.anchor {
                WindowAnchor::LastFailure => now_ms,
                WindowAnchor::FirstFailure => record.last_attempt_at_ms.unwrap_or(now_ms),
            };
            let updated = self.attempts.increment(class, failed_at)?;

            tracing::warn!(
                class = %class,
                identifier = %mask_sensitive(identifier, 3),
                attempt_count = updated.attempt_count,
                max_attempts = config.max_attempts,
                "Login failed: invalid credentials"
            );

            let error = match class {
                AccountClass::Privileged => CredentialError::InvalidAdminCredentials,
                AccountClass::Standard => CredentialError::InvalidCredentials,
            };
            return Ok(AuthOutcome::Rejected(RejectReason::Credential(error)));
        }

        // Counter is cleared only once the session is in place
        let role = Role::for_class(class);
        let session = self.sessions.establish(
            &subject_id_for(identifier, class),
            role,
            timestamp_from_ms(now_ms),
        )?;
        self.attempts.reset(class)?;

        tracing::info!(
            class = %class,
            role = %role,
            landing = role.landing_path(),
            "Login successful"
        );
        Ok(AuthOutcome::Authenticated { session })
    }

    /// Clear the active session.
    pub fn logout(&self) -> StoreResult<()> {
        self.sessions.clear()
    }

    pub fn current_session(&self) -> StoreResult<Option<SessionRecord>> {
        self.sessions.current()
    }

    /// Record and lockout decision for `class` as of the clock's current time.
    pub fn attempt_status(
        &self,
        class: AccountClass,
    ) -> StoreResult<(AttemptRecord, LockoutDecision)> {
        let record = self.attempts.get(class)?;
        let config = self.configs.for_class(class);
        let decision = LockoutPolicy::evaluate(&record, config, self.clock.now_ms());
        Ok((record, decision))
    }

    /// Operator override: forget all failures for `class`.
    pub fn reset_attempts(&self, class: AccountClass) -> StoreResult<()> {
        tracing::info!(class = %class, "Attempt counter reset by operator");
        self.attempts.reset(class)
    }

    pub fn attempts(&self) -> &AttemptStore {
        &self.attempts
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn configs(&self) -> &ClassConfigs {
        &self.configs
    }
}

fn timestamp_from_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end lockout and session behaviour through the public API.
//!
//! Voter failures are driven with a validator that rejects every standard
//! login, since the shipped mock accepts any well-formed voter credential.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use votegate::auth::{
    AccountClass, AuthController, AuthOutcome, ClassConfigs, Classifier, Clock,
    CredentialValidator, LockoutConfig, MockCredentialValidator, RemainingTime, Role,
    SessionManager, ValidatorError, WindowAnchor,
};
use votegate::error::{CredentialError, RejectReason};
use votegate::store::{FileStore, KeyValueStore, MemoryStore, StoreError, StoreResult};

const ADMIN: &str = "admin@votegate.local";
const ADMIN_SECRET: &str = "Correct-Horse-9";
const VOTER: &str = "alice@example.org";
const VOTER_SECRET: &str = "password123";

// =============================================================================
// Fixtures
// =============================================================================

struct VoterRejecting {
    inner: MockCredentialValidator,
}

impl VoterRejecting {
    fn new() -> Self {
        Self {
            inner: MockCredentialValidator::new(
                Classifier::new(ADMIN),
                Some(ADMIN_SECRET.to_string()),
            ),
        }
    }
}

impl CredentialValidator for VoterRejecting {
    fn classify(&self, identifier: &str) -> AccountClass {
        self.inner.classify(identifier)
    }

    fn validate(
        &self,
        identifier: &str,
        secret: &str,
        class: AccountClass,
    ) -> Result<bool, ValidatorError> {
        match class {
            AccountClass::Standard => Ok(false),
            AccountClass::Privileged => self.inner.validate(identifier, secret, class),
        }
    }
}

/// Clock tests can move by hand.
#[derive(Clone, Default)]
struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    fn set(&self, ms: i64) {
        self.0.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Store whose writes can be switched off to simulate an unavailable backend.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    broken: AtomicBool,
}

impl FlakyStore {
    fn check(&self) -> StoreResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("quota exceeded".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.delete(key)
    }

    fn clear(&self) -> StoreResult<()> {
        self.check()?;
        self.inner.clear()
    }
}

fn voter_rejecting_controller() -> (Arc<MemoryStore>, AuthController) {
    let store = Arc::new(MemoryStore::new());
    let auth = AuthController::new(store.clone(), VoterRejecting::new(), ClassConfigs::default());
    (store, auth)
}

fn mock_controller() -> AuthController {
    let validator =
        MockCredentialValidator::new(Classifier::new(ADMIN), Some(ADMIN_SECRET.to_string()));
    AuthController::new(Arc::new(MemoryStore::new()), validator, ClassConfigs::default())
}

fn voter_failure() -> AuthOutcome {
    AuthOutcome::Rejected(RejectReason::Credential(CredentialError::InvalidCredentials))
}

fn admin_failure() -> AuthOutcome {
    AuthOutcome::Rejected(RejectReason::Credential(
        CredentialError::InvalidAdminCredentials,
    ))
}

// =============================================================================
// Counting and lockout
// =============================================================================

#[test]
fn test_failed_voter_submissions_count_monotonically() {
    let (_, auth) = voter_rejecting_controller();

    for n in 1..=3u32 {
        let outcome = auth.submit_at(VOTER, VOTER_SECRET, n as i64 * 1_000);
        assert_eq!(outcome, voter_failure());
        assert_eq!(auth.attempts().get(AccountClass::Standard).unwrap().attempt_count, n);
    }
}

#[test]
fn test_standard_counter_is_shared_across_identifiers() {
    let (_, auth) = voter_rejecting_controller();

    auth.submit_at("alice@example.org", VOTER_SECRET, 0);
    auth.submit_at("bob@example.org", VOTER_SECRET, 1_000);
    auth.submit_at("carol@example.org", VOTER_SECRET, 2_000);

    assert!(matches!(
        auth.submit_at("dave@example.org", VOTER_SECRET, 3_000),
        AuthOutcome::LockedOut { .. }
    ));
}

#[test]
fn test_standard_lockout_after_three_failures() {
    let (_, auth) = voter_rejecting_controller();
    for t in [0, 1_000, 2_000] {
        auth.submit_at(VOTER, VOTER_SECRET, t);
    }

    // Window runs from the last failure at t=2000
    assert_eq!(
        auth.submit_at(VOTER, VOTER_SECRET, 3_000),
        AuthOutcome::LockedOut {
            remaining: RemainingTime::new(899_000)
        }
    );
    assert_eq!(auth.attempts().get(AccountClass::Standard).unwrap().attempt_count, 3);
}

#[test]
fn test_privileged_lockout_after_five_failures_even_with_correct_secret() {
    let (_, auth) = voter_rejecting_controller();
    for t in 0..5 {
        assert_eq!(auth.submit_at(ADMIN, "wrong-secret", t * 1_000), admin_failure());
    }

    let outcome = auth.submit_at(ADMIN, ADMIN_SECRET, 5_000);
    assert_eq!(
        outcome,
        AuthOutcome::LockedOut {
            remaining: RemainingTime::new(299_000)
        }
    );
    assert!(auth.current_session().unwrap().is_none());
}

#[test]
fn test_lockout_of_one_class_does_not_block_the_other() {
    let (_, auth) = voter_rejecting_controller();
    for t in [0, 1_000, 2_000] {
        auth.submit_at(VOTER, VOTER_SECRET, t);
    }

    let outcome = auth.submit_at(ADMIN, ADMIN_SECRET, 3_000);
    assert_eq!(outcome.role(), Some(Role::Admin));
}

// =============================================================================
// Window expiry
// =============================================================================

#[test]
fn test_window_expiry_resets_counter() {
    let (_, auth) = voter_rejecting_controller();
    for t in [0, 1_000, 2_000] {
        auth.submit_at(VOTER, VOTER_SECRET, t);
    }
    assert!(matches!(
        auth.submit_at(VOTER, VOTER_SECRET, 3_000),
        AuthOutcome::LockedOut { .. }
    ));

    // Exactly one window after the last failure: lapsed, counter restarts at 1
    let outcome = auth.submit_at(VOTER, VOTER_SECRET, 902_000);
    assert_eq!(outcome, voter_failure());
    let record = auth.attempts().get(AccountClass::Standard).unwrap();
    assert_eq!(record.attempt_count, 1);
    assert_eq!(record.last_attempt_at_ms, Some(902_000));
}

#[test]
fn test_first_failure_anchor_scenario() {
    let store = Arc::new(MemoryStore::new());
    let configs = ClassConfigs {
        standard: LockoutConfig::standard_default().with_anchor(WindowAnchor::FirstFailure),
        ..ClassConfigs::default()
    };
    let auth = AuthController::new(store, VoterRejecting::new(), configs);

    for t in [0, 1_000, 2_000] {
        auth.submit_at(VOTER, VOTER_SECRET, t);
    }
    assert_eq!(
        auth.submit_at(VOTER, VOTER_SECRET, 3_000),
        AuthOutcome::LockedOut {
            remaining: RemainingTime::new(897_000)
        }
    );

    // t=900001 is past the window: allowed, counter reset before this failure
    auth.submit_at(VOTER, VOTER_SECRET, 900_001);
    let record = auth.attempts().get(AccountClass::Standard).unwrap();
    assert_eq!(record.attempt_count, 1);
    assert_eq!(record.last_attempt_at_ms, Some(900_001));
}

#[test]
fn test_lapsed_window_then_success_clears_record() {
    let (store, auth) = voter_rejecting_controller();
    for t in 0..5 {
        auth.submit_at(ADMIN, "wrong-secret", t * 1_000);
    }

    let outcome = auth.submit_at(ADMIN, ADMIN_SECRET, 4_000 + 300_000);
    assert_eq!(outcome.role(), Some(Role::Admin));
    assert_eq!(store.get("adminLoginAttempts").unwrap().as_deref(), Some("0"));
    assert_eq!(store.get("adminLastAttemptTime").unwrap(), None);
}

#[test]
fn test_clock_driven_submit() {
    let clock = ManualClock::default();
    let auth = AuthController::new(
        Arc::new(MemoryStore::new()),
        VoterRejecting::new(),
        ClassConfigs::default(),
    )
    .with_clock(clock.clone());

    for t in [10_000, 11_000, 12_000] {
        clock.set(t);
        auth.submit(VOTER, VOTER_SECRET);
    }
    clock.set(12_000 + 60_000);
    let outcome = auth.submit(VOTER, VOTER_SECRET);
    assert_eq!(
        outcome.message(),
        "Account temporarily locked due to too many failed attempts. \
         Please try again in 14 minutes."
    );
}

// =============================================================================
// Success and sessions
// =============================================================================

#[test]
fn test_admin_wrong_then_right_secret() {
    let auth = mock_controller();

    assert_eq!(auth.submit_at(ADMIN, "wrong-secret", 0), admin_failure());
    assert_eq!(auth.attempts().get(AccountClass::Privileged).unwrap().attempt_count, 1);

    let outcome = auth.submit_at(ADMIN, ADMIN_SECRET, 1_000);
    assert_eq!(outcome.role(), Some(Role::Admin));

    let record = auth.attempts().get(AccountClass::Privileged).unwrap();
    assert_eq!(record.attempt_count, 0);
    assert_eq!(record.last_attempt_at_ms, None);

    let session = auth.current_session().unwrap().unwrap();
    assert_eq!(session.subject_id, "Admin");
    assert_eq!(session.role, Role::Admin);
}

#[test]
fn test_voter_login_keeps_admin_counter() {
    let auth = mock_controller();
    auth.submit_at(ADMIN, "wrong-secret", 0);

    let outcome = auth.submit_at(VOTER, VOTER_SECRET, 1_000);
    assert_eq!(outcome.role(), Some(Role::Voter));

    // Logging in as a voter must not erase the privileged ledger
    assert_eq!(auth.attempts().get(AccountClass::Privileged).unwrap().attempt_count, 1);
}

#[test]
fn test_new_login_supersedes_previous_session() {
    let auth = mock_controller();
    auth.submit_at(VOTER, VOTER_SECRET, 0);
    auth.submit_at(ADMIN, ADMIN_SECRET, 1_000);

    let session = auth.current_session().unwrap().unwrap();
    assert_eq!(session.subject_id, "Admin");
    assert_eq!(session.role, Role::Admin);
    assert_eq!(session.established_at.timestamp_millis(), 1_000);
}

#[test]
fn test_failed_login_keeps_existing_session() {
    let auth = mock_controller();
    auth.submit_at(VOTER, VOTER_SECRET, 0);
    auth.submit_at(ADMIN, "wrong-secret", 1_000);

    let session = auth.current_session().unwrap().unwrap();
    assert_eq!(session.subject_id, "alice");
}

// =============================================================================
// Internal failures
// =============================================================================

#[test]
fn test_store_failure_is_internal_error_not_lockout_or_success() {
    let store = Arc::new(FlakyStore::default());
    let auth = AuthController::new(store.clone(), VoterRejecting::new(), ClassConfigs::default());

    store.broken.store(true, Ordering::SeqCst);
    let outcome = auth.submit_at(ADMIN, ADMIN_SECRET, 0);
    match &outcome {
        AuthOutcome::Rejected(RejectReason::Internal { reference }) => {
            assert!(reference.starts_with("ERR-"));
        }
        other => panic!("expected internal error, got {:?}", other),
    }
    assert!(outcome.message().contains("An error occurred during login"));

    store.broken.store(false, Ordering::SeqCst);
    assert!(auth.current_session().unwrap().is_none());
}

#[test]
fn test_corrupt_counter_is_internal_error() {
    let store = Arc::new(MemoryStore::new());
    store.set("userLoginAttempts", "many").unwrap();
    let auth = mock_controller_on(store);

    assert!(matches!(
        auth.submit_at(VOTER, VOTER_SECRET, 0),
        AuthOutcome::Rejected(RejectReason::Internal { .. })
    ));
}

fn mock_controller_on(store: Arc<MemoryStore>) -> AuthController {
    let validator =
        MockCredentialValidator::new(Classifier::new(ADMIN), Some(ADMIN_SECRET.to_string()));
    AuthController::new(store, validator, ClassConfigs::default())
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_counters_and_session_survive_restart() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("store.json");

    {
        let auth = AuthController::new(
            Arc::new(FileStore::new(&path)),
            VoterRejecting::new(),
            ClassConfigs::default(),
        );
        auth.submit_at(VOTER, VOTER_SECRET, 0);
        auth.submit_at(VOTER, VOTER_SECRET, 1_000);
        auth.submit_at(ADMIN, ADMIN_SECRET, 2_000);
    }

    let reopened = Arc::new(FileStore::new(&path));
    let auth = AuthController::new(
        reopened.clone(),
        VoterRejecting::new(),
        ClassConfigs::default(),
    );

    assert_eq!(auth.attempts().get(AccountClass::Standard).unwrap().attempt_count, 2);
    let session = SessionManager::new(reopened).current().unwrap().unwrap();
    assert_eq!(session.role, Role::Admin);
}

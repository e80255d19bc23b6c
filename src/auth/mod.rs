// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Attempt-throttled authentication and session lifecycle.
//!
//! ## Components
//!
//! - [`attempts`] - per-class failure counters in the store
//! - [`policy`] - pure lockout decision and remaining-time formatting
//! - [`credentials`] - input checks, class dispatch, validator seam
//! - [`session`] - the single active session record
//! - [`controller`] - the login state machine tying them together
//!
//! ## Lockout budgets
//!
//! | Class | Attempts | Window |
//! |---|---|---|
//! | Privileged | 5 | 5 minutes |
//! | Standard | 3 | 15 minutes |
//!
//! Counters are shared per class, not per identifier, and expire lazily on
//! the next submission after the window has passed.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use votegate::auth::{AuthController, ClassConfigs, Classifier, MockCredentialValidator};
//! use votegate::store::MemoryStore;
//!
//! let validator = MockCredentialValidator::new(
//!     Classifier::new("admin@votegate.local"),
//!     Some("change-me-please".to_string()),
//! );
//! let auth = AuthController::new(Arc::new(MemoryStore::new()), validator, ClassConfigs::default());
//!
//! let outcome = auth.submit("alice@example.org", "password123");
//! println!("{}", outcome.message());
//! ```
//!
//! Concurrent submissions from separate processes sharing one store are not
//! serialized against each other; a read/increment race can miscount.

pub mod attempts;
pub mod class;
pub mod controller;
pub mod credentials;
pub mod policy;
pub mod session;

pub use attempts::{AttemptRecord, AttemptStore};
pub use class::{AccountClass, ClassConfigs, LockoutConfig, LockoutConfigError, WindowAnchor};
pub use controller::{AuthController, AuthOutcome, Clock, SystemClock};
pub use credentials::{
    check_input_shape, is_valid_identifier, Classifier, CredentialValidator,
    MockCredentialValidator, ValidatorError,
};
pub use policy::{LockoutDecision, LockoutPolicy, RemainingTime};
pub use session::{Role, SessionEvent, SessionManager, SessionRecord};

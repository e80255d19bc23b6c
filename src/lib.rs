// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! votegate - login throttling and session control for the VoteGate client
//!
//! Every sign-in goes through one state machine:
//!
//! **Shape check** -> **Lockout check** -> **Credential check** -> **Session**
//!
//! # Core Modules
//!
//! - [`auth`] - lockout policy, attempt ledger, validator seam, sessions, controller
//! - [`store`] - key/value persistence (in-memory and JSON file)
//! - [`guard`] - role-gated routes that consume the session
//! - [`config`] - on-disk configuration and controller wiring
//! - [`error`] - outcome taxonomy and reference codes

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod store;
pub mod utils;

pub use auth::{
    AccountClass, AttemptRecord, AuthController, AuthOutcome, ClassConfigs, LockoutConfig,
    LockoutDecision, RemainingTime, Role, SessionRecord,
};
pub use config::Config;
pub use error::{AuthError, CredentialError, RejectReason, ValidationError};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

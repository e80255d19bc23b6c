// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Key/value persistence for attempt counters and the session record.
//!
//! Everything the auth core remembers between submissions goes through the
//! [`KeyValueStore`] trait. Values are UTF-8 strings; numbers are written as
//! base-10 decimal text so the on-disk format stays readable.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStore`] - process-local, used by tests and embedders
//! - [`FileStore`] - JSON file with advisory locking, survives restarts

pub mod file;
pub mod locks;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Failures surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timed out waiting for store lock after {waited_ms}ms")]
    Lock { waited_ms: u64 },

    #[error("corrupt value for key '{key}': {value:?}")]
    Corrupt { key: String, value: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Generic string key/value repository.
///
/// Implementations must be safe to share between the attempt ledger and the
/// session manager; each call is independent and no multi-key transaction is
/// offered.
pub trait KeyValueStore: Send + Sync {
    /// Read a key. Missing keys are `Ok(None)`, not an error.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a key, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Remove every key.
    fn clear(&self) -> StoreResult<()>;

    /// Read a key and parse it as a base-10 integer.
    fn get_i64(&self, key: &str) -> StoreResult<Option<i64>> {
        match self.get(key)? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| StoreError::Corrupt {
                    key: key.to_string(),
                    value: raw,
                }),
        }
    }
}

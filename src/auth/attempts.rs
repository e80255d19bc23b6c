// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-class ledger of failed attempts.
//!
//! One record per [`AccountClass`], not per identifier: every standard-class
//! failure shares the same counter. Keys follow `{prefix}LoginAttempts` and
//! `{prefix}LastAttemptTime`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::class::AccountClass;
use crate::store::{KeyValueStore, StoreError, StoreResult};

/// Snapshot of one class's failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub class: AccountClass,
    pub attempt_count: u32,
    pub last_attempt_at_ms: Option<i64>,
}

impl AttemptRecord {
    pub fn empty(class: AccountClass) -> Self {
        Self {
            class,
            attempt_count: 0,
            last_attempt_at_ms: None,
        }
    }

    /// True when nothing has been recorded since the last reset.
    pub fn is_clear(&self) -> bool {
        self.attempt_count == 0 && self.last_attempt_at_ms.is_none()
    }
}

pub fn attempts_key(class: AccountClass) -> String {
    format!("{}LoginAttempts", class.storage_prefix())
}

pub fn last_attempt_key(class: AccountClass) -> String {
    format!("{}LastAttemptTime", class.storage_prefix())
}

/// Sole owner of [`AttemptRecord`] values in the store.
pub struct AttemptStore {
    store: Arc<dyn KeyValueStore>,
}

impl AttemptStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current record; missing keys read as zero / none.
    pub fn get(&self, class: AccountClass) -> StoreResult<AttemptRecord> {
        let key = attempts_key(class);
        let attempt_count = match self.store.get_i64(&key)? {
            None => 0,
            Some(n) => u32::try_from(n).map_err(|_| StoreError::Corrupt {
                key: key.clone(),
                value: n.to_string(),
            })?,
        };
        let last_attempt_at_ms = self.store.get_i64(&last_attempt_key(class))?;

        Ok(AttemptRecord {
            class,
            attempt_count,
            last_attempt_at_ms,
        })
    }

    /// Record a failure at `at_ms`: `count += 1`, `last = at_ms`.
    pub fn increment(&self, class: AccountClass, at_ms: i64) -> StoreResult<AttemptRecord> {
        let current = self.get(class)?;
        let attempt_count = current.attempt_count.saturating_add(1);

        self.store
            .set(&attempts_key(class), &attempt_count.to_string())?;
        self.store
            .set(&last_attempt_key(class), &at_ms.to_string())?;

        tracing::debug!(
            class = %class,
            attempt_count,
            at_ms,
            "Recorded failed attempt"
        );

        Ok(AttemptRecord {
            class,
            attempt_count,
            last_attempt_at_ms: Some(at_ms),
        })
    }

    /// Zero the counter and forget the timestamp.
    pub fn reset(&self, class: AccountClass) -> StoreResult<()> {
        self.store.set(&attempts_key(class), "0")?;
        self.store.delete(&last_attempt_key(class))?;
        tracing::debug!(class = %class, "Attempt counter reset");
        Ok(())
    }
}

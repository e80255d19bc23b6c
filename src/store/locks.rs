// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Poison-tolerant lock helpers for the in-memory store.
//!
//! A panic while a writer holds the map poisons the `RwLock`. The map only
//! holds plain strings, and every store mutation is a single insert or
//! remove, so the data behind a poisoned lock is still usable. We log the
//! event and hand out the guard instead of failing every later login.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read lock, recovering from poisoning.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "votegate::store",
                event = "STORE_LOCK_POISONED_READ",
                "Store lock was poisoned during read. Recovering contents."
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire a write lock, recovering from poisoning.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "votegate::store",
                event = "STORE_LOCK_POISONED_WRITE",
                "Store lock was poisoned during write. Recovering contents."
            );
            poisoned.into_inner()
        }
    }
}

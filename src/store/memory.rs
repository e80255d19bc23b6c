// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Process-local store backed by a `HashMap`.

use std::collections::HashMap;
use std::sync::RwLock;

use super::locks::{resilient_read, resilient_write};
use super::{KeyValueStore, StoreResult};

/// In-memory [`KeyValueStore`]. Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        resilient_read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every key/value pair, for inspection in tests and `status`.
    pub fn snapshot(&self) -> HashMap<String, String> {
        resilient_read(&self.entries).clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(resilient_read(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        resilient_write(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        resilient_write(&self.entries).remove(key);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        resilient_write(&self.entries).clear();
        Ok(())
    }
}

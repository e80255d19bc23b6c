// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The single active session.
//!
//! ## Store keys
//!
//! | Key | Value |
//! |---|---|
//! | `isAuthenticated` | `"true"` while a session exists |
//! | `userRole` | `"admin"` or `"voter"` |
//! | `username` | display identifier of the subject |
//! | `sessionEstablishedAt` | epoch milliseconds |
//!
//! `establish` deletes exactly these keys before writing new ones, and writes
//! `isAuthenticated` last; `clear` deletes it first. A reader never sees a
//! half-written session as authenticated. Attempt counters live under other
//! keys and are never touched here.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::class::AccountClass;
use crate::store::{KeyValueStore, StoreResult};
use crate::utils::mask_sensitive;

pub const KEY_IS_AUTHENTICATED: &str = "isAuthenticated";
pub const KEY_USER_ROLE: &str = "userRole";
pub const KEY_USERNAME: &str = "username";
pub const KEY_ESTABLISHED_AT: &str = "sessionEstablishedAt";

/// Every key owned by the session record.
pub const SESSION_KEYS: [&str; 4] = [
    KEY_IS_AUTHENTICATED,
    KEY_USER_ROLE,
    KEY_USERNAME,
    KEY_ESTABLISHED_AT,
];

/// Display name used as the subject of privileged sessions.
pub const ADMIN_SUBJECT_ID: &str = "Admin";

/// Role granted to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Voter,
    Admin,
}

impl Role {
    pub fn for_class(class: AccountClass) -> Self {
        match class {
            AccountClass::Privileged => Role::Admin,
            AccountClass::Standard => Role::Voter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Voter => "voter",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "voter" => Some(Role::Voter),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Where a caller should send this role after login.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Voter => "/dashboard",
            Role::Admin => "/admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subject id for a successful login: `Admin` for privileged logins, the
/// local part of the identifier otherwise.
pub fn subject_id_for(identifier: &str, class: AccountClass) -> String {
    match class {
        AccountClass::Privileged => ADMIN_SUBJECT_ID.to_string(),
        AccountClass::Standard => identifier
            .split('@')
            .next()
            .unwrap_or(identifier)
            .to_string(),
    }
}

/// The authenticated identity produced by a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub subject_id: String,
    pub role: Role,
    pub established_at: DateTime<Utc>,
}

/// Session events for audit logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    Established {
        subject_id: String,
        role: Role,
        timestamp: DateTime<Utc>,
    },
    Superseded {
        previous_subject_id: String,
        timestamp: DateTime<Utc>,
    },
    Cleared {
        subject_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Format event for audit log
    pub fn to_audit_string(&self) -> String {
        match self {
            SessionEvent::Established { subject_id, role, timestamp } => format!(
                "{} | SESSION_ESTABLISHED | subject={} role={}",
                timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                mask_sensitive(subject_id, 3),
                role
            ),
            SessionEvent::Superseded { previous_subject_id, timestamp } => format!(
                "{} | SESSION_SUPERSEDED | previous={}",
                timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                mask_sensitive(previous_subject_id, 3)
            ),
            SessionEvent::Cleared { subject_id, timestamp } => format!(
                "{} | SESSION_CLEARED | subject={}",
                timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                subject_id
                    .as_deref()
                    .map(|s| mask_sensitive(s, 3))
                    .unwrap_or_else(|| "-".to_string())
            ),
        }
    }
}

/// Sole owner of the [`SessionRecord`] keys in the store.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Replace any existing session with a new one.
    pub fn establish(
        &self,
        subject_id: &str,
        role: Role,
        established_at: DateTime<Utc>,
    ) -> StoreResult<SessionRecord> {
        // Only the previous subject is read; a malformed old record must not block the new one
        if let Some(previous_subject_id) = self.store.get(KEY_USERNAME)? {
            let event = SessionEvent::Superseded {
                previous_subject_id,
                timestamp: established_at,
            };
            tracing::info!("{}", event.to_audit_string());
        }
        self.delete_session_keys()?;

        self.store.set(KEY_USER_ROLE, role.as_str())?;
        self.store.set(KEY_USERNAME, subject_id)?;
        self.store.set(
            KEY_ESTABLISHED_AT,
            &established_at.timestamp_millis().to_string(),
        )?;
        self.store.set(KEY_IS_AUTHENTICATED, "true")?;

        let event = SessionEvent::Established {
            subject_id: subject_id.to_string(),
            role,
            timestamp: established_at,
        };
        tracing::info!("{}", event.to_audit_string());

        Ok(SessionRecord {
            subject_id: subject_id.to_string(),
            role,
            established_at,
        })
    }

    /// The active session, if one is fully present.
    pub fn current(&self) -> StoreResult<Option<SessionRecord>> {
        if self.store.get(KEY_IS_AUTHENTICATED)?.as_deref() != Some("true") {
            return Ok(None);
        }
        let Some(role) = self.store.get(KEY_USER_ROLE)?.as_deref().and_then(Role::parse) else {
            return Ok(None);
        };
        let Some(subject_id) = self.store.get(KEY_USERNAME)? else {
            return Ok(None);
        };
        let established_at = self
            .store
            .get_i64(KEY_ESTABLISHED_AT)?
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Ok(Some(SessionRecord {
            subject_id,
            role,
            established_at,
        }))
    }

    /// Log out. Removes only the session keys.
    pub fn clear(&self) -> StoreResult<()> {
        let subject_id = self.store.get(KEY_USERNAME)?;
        self.delete_session_keys()?;

        let event = SessionEvent::Cleared {
            subject_id,
            timestamp: Utc::now(),
        };
        tracing::info!("{}", event.to_audit_string());
        Ok(())
    }

    fn delete_session_keys(&self) -> StoreResult<()> {
        // isAuthenticated is first in SESSION_KEYS so the flag drops before the fields
        for key in SESSION_KEYS {
            self.store.delete(key)?;
        }
        Ok(())
    }
}

// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Lockout decision: pure function of (record, config, now).
//!
//! The window is evaluated lazily on each submission; there is no timer that
//! expires a lockout on its own.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::attempts::AttemptRecord;
use super::class::LockoutConfig;

/// Outcome of [`LockoutPolicy::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockoutDecision {
    /// The submission may proceed. `window_lapsed` means the stored record is
    /// stale and the caller must reset it before continuing.
    Allowed { window_lapsed: bool },
    /// Too many failures inside the window.
    Locked { remaining_ms: u64 },
}

pub struct LockoutPolicy;

impl LockoutPolicy {
    /// Decide whether a class may attempt a login at `now_ms`.
    ///
    /// `elapsed == window_ms` counts as lapsed. A timestamp in the future
    /// (clock moved backwards) is treated as `elapsed = 0`.
    pub fn evaluate(
        record: &AttemptRecord,
        config: &LockoutConfig,
        now_ms: i64,
    ) -> LockoutDecision {
        let elapsed = match record.last_attempt_at_ms {
            None => return LockoutDecision::Allowed { window_lapsed: true },
            Some(last) => now_ms.saturating_sub(last).max(0) as u64,
        };

        if elapsed >= config.window_ms {
            return LockoutDecision::Allowed { window_lapsed: true };
        }

        if record.attempt_count >= config.max_attempts {
            return LockoutDecision::Locked {
                remaining_ms: config.window_ms - elapsed,
            };
        }

        LockoutDecision::Allowed { window_lapsed: false }
    }
}

/// Remaining lockout time, formatted for people.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingTime {
    pub ms: u64,
}

impl RemainingTime {
    pub fn new(ms: u64) -> Self {
        Self { ms }
    }

    /// `ceil(ms / 60000)`
    pub fn minutes(&self) -> u64 {
        self.ms.div_ceil(60_000)
    }

    /// `ceil(ms / 1000) % 60`
    pub fn seconds(&self) -> u64 {
        self.ms.div_ceil(1_000) % 60
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.minutes();
        let seconds = self.seconds();

        if minutes == 0 {
            return write!(f, "{}", plural(seconds, "second"));
        }
        write!(f, "{}", plural(minutes, "minute"))?;
        if seconds > 0 {
            write!(f, " and {}", plural(seconds, "second"))?;
        }
        Ok(())
    }
}

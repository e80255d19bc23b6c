// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Small helpers shared across modules.

/// Mask an identifier for logging.
///
/// Keeps the first `visible_prefix` characters and replaces the rest with
/// "...". Inputs no longer than the prefix are still suffixed so the log
/// never shows whether a value was cut.
///
/// # Examples
///
/// ```
/// use votegate::utils::mask_sensitive;
///
/// assert_eq!(mask_sensitive("alice@example.org", 3), "ali...");
/// ```
pub fn mask_sensitive(input: &str, visible_prefix: usize) -> String {
    let prefix: String = input.chars().take(visible_prefix).collect();
    format!("{}...", prefix)
}

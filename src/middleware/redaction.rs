// ABOUTME: Redaction helpers that keep caller keys out of logs
// ABOUTME: Reduces a key to a short prefix sufficient for correlating log lines
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Characters of a caller key kept in log output
const VISIBLE_PREFIX_CHARS: usize = 4;

/// Redact a caller key for logging
///
/// Keys shorter than twice the visible prefix are fully masked.
#[must_use]
pub fn redact_caller_key(key: &str) -> String {
    if key.chars().count() < VISIBLE_PREFIX_CHARS * 2 {
        return "****".to_owned();
    }
    let prefix: String = key.chars().take(VISIBLE_PREFIX_CHARS).collect();
    format!("{prefix}****")
}

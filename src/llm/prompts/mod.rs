// ABOUTME: System prompts for campaign analytics chat loaded at compile time
// ABOUTME: Provides the default assistant instructions used when no override is configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # System Prompts
//!
//! Prompts are loaded at compile time from markdown files for easy maintenance.

/// Campaign analytics assistant system prompt
///
/// Contains the assistant's role, the available gateway tools, and
/// guidelines for reporting impression numbers.
pub const CAMPAIGN_SYSTEM_PROMPT: &str = include_str!("campaign_system.md");

/// Get the default system prompt
///
/// Used when `CHAT_SYSTEM_PROMPT` is not set.
#[must_use]
pub const fn default_system_prompt() -> &'static str {
    CAMPAIGN_SYSTEM_PROMPT
}

#[cfg(test)]
mod tests {
    use super::*;
    use adchat_core::constants::tools;

    #[test]
    fn test_prompt_mentions_every_tool() {
        let prompt = default_system_prompt();
        for name in [tools::GET_IMPRESSIONS, tools::LIST_CAMPAIGNS, tools::GET_CAMPAIGN] {
            assert!(prompt.contains(name), "prompt is missing {name}");
        }
    }
}

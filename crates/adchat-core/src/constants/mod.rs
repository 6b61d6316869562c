// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Limits, defaults, environment variable names, tool and step identifiers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped by domain rather than kept in a single flat list.

/// Environment variable names read by the configuration layer
pub mod env_vars {
    /// HTTP listen port
    pub const HTTP_PORT: &str = "HTTP_PORT";
    /// sqlx database URL
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Enable the deterministic mock engine
    pub const CHAT_MOCK_MODE: &str = "CHAT_MOCK_MODE";
    /// Canned answer returned in mock mode
    pub const CHAT_MOCK_ANSWER: &str = "CHAT_MOCK_ANSWER";
    /// OpenAI-compatible base URL
    pub const LLM_BASE_URL: &str = "LLM_BASE_URL";
    /// Bearer key for the model endpoint
    pub const LLM_API_KEY: &str = "LLM_API_KEY";
    /// Model identifier
    pub const LLM_MODEL: &str = "LLM_MODEL";
    /// Sampling temperature
    pub const LLM_TEMPERATURE: &str = "LLM_TEMPERATURE";
    /// Per model call deadline
    pub const LLM_TIMEOUT_SECS: &str = "LLM_TIMEOUT_SECS";
    /// Tool gateway base URL
    pub const TOOL_GATEWAY_URL: &str = "TOOL_GATEWAY_URL";
    /// Bearer token for the tool gateway
    pub const TOOL_GATEWAY_TOKEN: &str = "TOOL_GATEWAY_TOKEN";
    /// Per tool call deadline
    pub const TOOL_GATEWAY_TIMEOUT_SECS: &str = "TOOL_GATEWAY_TIMEOUT_SECS";
    /// Comma-separated list restricting the tool schema
    pub const CHAT_ENABLED_TOOLS: &str = "CHAT_ENABLED_TOOLS";
    /// Round limit of the tool-resolution loop
    pub const CHAT_MAX_TOOL_ROUNDS: &str = "CHAT_MAX_TOOL_ROUNDS";
    /// Number of history messages loaded per turn
    pub const CHAT_HISTORY_WINDOW: &str = "CHAT_HISTORY_WINDOW";
    /// Overall turn deadline
    pub const CHAT_TURN_TIMEOUT_SECS: &str = "CHAT_TURN_TIMEOUT_SECS";
    /// Serialize concurrent turns on one conversation
    pub const CHAT_SERIALIZE_TURNS: &str = "CHAT_SERIALIZE_TURNS";
    /// System prompt override
    pub const CHAT_SYSTEM_PROMPT: &str = "CHAT_SYSTEM_PROMPT";
    /// Comma-separated CORS origins or `*`
    pub const CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
}

/// Default configuration values
pub mod defaults {
    /// Default HTTP port
    pub const HTTP_PORT: u16 = 8081;
    /// Default database location
    pub const DATABASE_URL: &str = "sqlite:./data/adchat.db";
    /// Default OpenAI-compatible endpoint
    pub const LLM_BASE_URL: &str = "https://api.openai.com/v1";
    /// Default model identifier
    pub const LLM_MODEL: &str = "gpt-4o-mini";
    /// Default per model call deadline
    pub const LLM_TIMEOUT_SECS: u64 = 60;
    /// Default tool gateway location
    pub const TOOL_GATEWAY_URL: &str = "http://localhost:8090";
    /// Default per tool call deadline
    pub const TOOL_GATEWAY_TIMEOUT_SECS: u64 = 30;
    /// Default round limit
    pub const MAX_TOOL_ROUNDS: usize = 5;
    /// Default history window
    pub const HISTORY_WINDOW: u32 = 20;
    /// Default overall turn deadline
    pub const TURN_TIMEOUT_SECS: u64 = 120;
    /// Default canned answer for mock mode
    pub const MOCK_ANSWER: &str = "This is a mock response. Campaign analytics are not available in mock mode, but your message was received.";
}

/// Request and storage limits
pub mod limits {
    /// Maximum characters in a user message
    pub const MAX_MESSAGE_CHARS: usize = 32_000;
    /// Maximum attachments per request
    pub const MAX_ATTACHMENTS: usize = 8;
    /// Maximum decoded size of one attachment
    pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;
    /// Characters of a text attachment inlined into the prompt
    pub const MAX_ATTACHMENT_INLINE_CHARS: usize = 8_000;
    /// Characters of a tool result body forwarded to the model
    pub const MAX_TOOL_RESULT_CHARS: usize = 16_000;
    /// Upper bound for `list_messages` limits
    pub const MAX_HISTORY_LIMIT: u32 = 200;
    /// Default page size for the messages endpoint
    pub const DEFAULT_MESSAGES_LIMIT: u32 = 50;
    /// Upper bound accepted for the configured round limit
    pub const MAX_TOOL_ROUNDS_CEILING: usize = 20;
    /// Maximum request body accepted by the HTTP layer
    pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024 * 1024;
}

/// Gateway tool names
pub mod tools {
    /// Impression analytics for one campaign
    pub const GET_IMPRESSIONS: &str = "get_impressions";
    /// List campaigns visible to the caller
    pub const LIST_CAMPAIGNS: &str = "list_campaigns";
    /// Campaign metadata
    pub const GET_CAMPAIGN: &str = "get_campaign";
}

/// Synthetic step names recorded alongside tool invocations
pub mod steps {
    /// Model call that failed after the first round
    pub const MODEL: &str = "model";
    /// Loop truncated by the round limit
    pub const ROUND_LIMIT: &str = "round_limit";
    /// Conversation persistence failed after the answer was produced
    pub const PERSIST_HISTORY: &str = "persist_history";
    /// Status recorded for a truncated loop
    pub const ROUND_LIMIT_STATUS: u16 = 508;
    /// Status recorded for a persistence failure
    pub const PERSIST_HISTORY_STATUS: u16 = 500;
}

/// HTTP header names
pub mod headers {
    /// Caller key header
    pub const API_KEY: &str = "x-api-key";
    /// Request correlation header
    pub const REQUEST_ID: &str = "x-request-id";
}

/// Service identity used in logs
pub mod service_names {
    /// Service name
    pub const ADCHAT_SERVER: &str = "adchat-server";
}

// ABOUTME: Environment-based server configuration with defaults and validation
// ABOUTME: Groups model endpoint, tool gateway, and orchestration engine settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::time::Duration;

use adchat_core::constants::{defaults, env_vars, limits};
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::llm::default_system_prompt;

// ============================================================================
// Configuration Types
// ============================================================================

/// Model endpoint settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// Bearer key
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Per-call deadline in seconds
    pub timeout_secs: u64,
}

/// Tool gateway settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway base URL
    pub base_url: String,
    /// Bearer token
    pub token: Option<String>,
    /// Per-call deadline in seconds
    pub timeout_secs: u64,
}

/// Orchestration engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Serve canned answers without any model or gateway call
    pub mock_mode: bool,
    /// Answer returned in mock mode
    pub mock_answer: String,
    /// Restricts the tool schema; `None` enables every tool
    pub enabled_tools: Option<Vec<String>>,
    /// Maximum model rounds per turn
    pub max_tool_rounds: usize,
    /// History messages loaded per turn
    pub history_window: u32,
    /// Overall turn deadline in seconds
    pub turn_timeout_secs: u64,
    /// Run turns on the same conversation one at a time
    pub serialize_turns: bool,
    /// System prompt sent at the head of every turn
    pub system_prompt: String,
}

impl EngineConfig {
    /// Overall turn deadline
    #[must_use]
    pub const fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// sqlx database URL
    pub database_url: String,
    /// Comma-separated CORS origins or `*`
    pub cors_allowed_origins: String,
    /// Model endpoint
    pub llm: LlmConfig,
    /// Tool gateway
    pub gateway: GatewayConfig,
    /// Orchestration engine
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: defaults::HTTP_PORT,
            database_url: defaults::DATABASE_URL.to_owned(),
            cors_allowed_origins: "*".to_owned(),
            llm: LlmConfig {
                base_url: defaults::LLM_BASE_URL.to_owned(),
                api_key: None,
                model: defaults::LLM_MODEL.to_owned(),
                temperature: None,
                timeout_secs: defaults::LLM_TIMEOUT_SECS,
            },
            gateway: GatewayConfig {
                base_url: defaults::TOOL_GATEWAY_URL.to_owned(),
                token: None,
                timeout_secs: defaults::TOOL_GATEWAY_TIMEOUT_SECS,
            },
            engine: EngineConfig {
                mock_mode: false,
                mock_answer: defaults::MOCK_ANSWER.to_owned(),
                enabled_tools: None,
                max_tool_rounds: defaults::MAX_TOOL_ROUNDS,
                history_window: defaults::HISTORY_WINDOW,
                turn_timeout_secs: defaults::TURN_TIMEOUT_SECS,
                serialize_turns: true,
                system_prompt: default_system_prompt().to_owned(),
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be parsed
    /// or the resulting configuration fails validation.
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = Self {
            http_port: env_var_or(env_vars::HTTP_PORT, &defaults::HTTP_PORT.to_string())
                .parse()
                .context("Invalid HTTP_PORT value")?,
            database_url: env_var_or(env_vars::DATABASE_URL, defaults::DATABASE_URL),
            cors_allowed_origins: env_var_or(env_vars::CORS_ALLOWED_ORIGINS, "*"),
            llm: LlmConfig {
                base_url: env_var_or(env_vars::LLM_BASE_URL, defaults::LLM_BASE_URL),
                api_key: env_var_opt(env_vars::LLM_API_KEY),
                model: env_var_or(env_vars::LLM_MODEL, defaults::LLM_MODEL),
                temperature: env_var_opt(env_vars::LLM_TEMPERATURE)
                    .map(|raw| raw.parse::<f32>())
                    .transpose()
                    .context("Invalid LLM_TEMPERATURE value")?,
                timeout_secs: env_var_or(
                    env_vars::LLM_TIMEOUT_SECS,
                    &defaults::LLM_TIMEOUT_SECS.to_string(),
                )
                .parse()
                .context("Invalid LLM_TIMEOUT_SECS value")?,
            },
            gateway: GatewayConfig {
                base_url: env_var_or(env_vars::TOOL_GATEWAY_URL, defaults::TOOL_GATEWAY_URL),
                token: env_var_opt(env_vars::TOOL_GATEWAY_TOKEN),
                timeout_secs: env_var_or(
                    env_vars::TOOL_GATEWAY_TIMEOUT_SECS,
                    &defaults::TOOL_GATEWAY_TIMEOUT_SECS.to_string(),
                )
                .parse()
                .context("Invalid TOOL_GATEWAY_TIMEOUT_SECS value")?,
            },
            engine: EngineConfig {
                mock_mode: parse_bool(env_vars::CHAT_MOCK_MODE, false)?,
                mock_answer: env_var_or(env_vars::CHAT_MOCK_ANSWER, defaults::MOCK_ANSWER),
                enabled_tools: env_var_opt(env_vars::CHAT_ENABLED_TOOLS).map(|raw| parse_list(&raw)),
                max_tool_rounds: env_var_or(
                    env_vars::CHAT_MAX_TOOL_ROUNDS,
                    &defaults::MAX_TOOL_ROUNDS.to_string(),
                )
                .parse()
                .context("Invalid CHAT_MAX_TOOL_ROUNDS value")?,
                history_window: env_var_or(
                    env_vars::CHAT_HISTORY_WINDOW,
                    &defaults::HISTORY_WINDOW.to_string(),
                )
                .parse()
                .context("Invalid CHAT_HISTORY_WINDOW value")?,
                turn_timeout_secs: env_var_or(
                    env_vars::CHAT_TURN_TIMEOUT_SECS,
                    &defaults::TURN_TIMEOUT_SECS.to_string(),
                )
                .parse()
                .context("Invalid CHAT_TURN_TIMEOUT_SECS value")?,
                serialize_turns: parse_bool(env_vars::CHAT_SERIALIZE_TURNS, true)?,
                system_prompt: env_var_opt(env_vars::CHAT_SYSTEM_PROMPT)
                    .unwrap_or_else(|| default_system_prompt().to_owned()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error for out-of-range limits or zero deadlines.
    pub fn validate(&self) -> Result<()> {
        if !(1..=limits::MAX_TOOL_ROUNDS_CEILING).contains(&self.engine.max_tool_rounds) {
            bail!(
                "CHAT_MAX_TOOL_ROUNDS must be between 1 and {}",
                limits::MAX_TOOL_ROUNDS_CEILING
            );
        }
        if self.engine.history_window > limits::MAX_HISTORY_LIMIT {
            bail!(
                "CHAT_HISTORY_WINDOW must not exceed {}",
                limits::MAX_HISTORY_LIMIT
            );
        }
        if self.engine.turn_timeout_secs == 0
            || self.llm.timeout_secs == 0
            || self.gateway.timeout_secs == 0
        {
            bail!("Timeouts must be greater than zero seconds");
        }
        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                bail!("LLM_TEMPERATURE must be between 0.0 and 2.0");
            }
        }

        if !self.engine.mock_mode && self.llm.api_key.is_none() {
            warn!("LLM_API_KEY is not set; requests to the model endpoint will be unauthenticated");
        }

        Ok(())
    }

    /// Human-readable configuration summary without secrets
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Campaign Chat Server Configuration:\n\
             - HTTP Port: {}\n\
             - Database: {}\n\
             - Engine: {}\n\
             - Model: {} at {}\n\
             - Tool Gateway: {}\n\
             - Enabled Tools: {}\n\
             - Max Tool Rounds: {}\n\
             - History Window: {}\n\
             - Turn Timeout: {}s\n\
             - Serialize Turns: {}",
            self.http_port,
            if self.database_url.contains(":memory:") {
                "SQLite (in-memory)"
            } else {
                "SQLite"
            },
            if self.engine.mock_mode {
                "Mock"
            } else {
                "Orchestration"
            },
            self.llm.model,
            self.llm.base_url,
            self.gateway.base_url,
            self.engine
                .enabled_tools
                .as_ref()
                .map_or_else(|| "all".to_owned(), |tools| tools.join(", ")),
            self.engine.max_tool_rounds,
            self.engine.history_window,
            self.engine.turn_timeout_secs,
            if self.engine.serialize_turns {
                "Enabled"
            } else {
                "Disabled"
            },
        )
    }
}

// ============================================================================
// Environment Helpers
// ============================================================================

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Trimmed value of `key`, `None` when unset or blank
fn env_var_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_bool(key: &str, default: bool) -> Result<bool> {
    match env_var_opt(key) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("Invalid {key} value: '{raw}'"),
        },
    }
}

/// Parse a comma-separated list, dropping blanks
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides logging, in-memory stores, and engine construction helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `adchat_server`

use std::env;
use std::sync::{Arc, Once};
use std::time::Duration;

use adchat_server::database::{ChatStore, SqliteChatStore};
use adchat_server::llm::{default_system_prompt, ModelClient};
use adchat_server::services::{EngineSettings, OrchestrationEngine};
use adchat_server::tools::{ToolCatalog, ToolGatewayClient};
use tracing::Level;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Fresh in-memory conversation store
pub async fn create_test_store() -> Arc<SqliteChatStore> {
    init_test_logging();
    Arc::new(
        SqliteChatStore::in_memory()
            .await
            .expect("Failed to create in-memory store"),
    )
}

/// Engine settings for tests: short deadline, default round limit
pub fn test_settings() -> EngineSettings {
    EngineSettings {
        max_tool_rounds: 5,
        history_window: 20,
        turn_timeout: Duration::from_secs(10),
        serialize_turns: true,
        system_prompt: default_system_prompt().to_owned(),
    }
}

/// Build an orchestration engine over the given collaborators
pub fn create_engine(
    model: Arc<dyn ModelClient>,
    gateway: Arc<dyn ToolGatewayClient>,
    store: Arc<dyn ChatStore>,
    settings: EngineSettings,
) -> OrchestrationEngine {
    init_test_logging();
    OrchestrationEngine::new(model, gateway, store, ToolCatalog::default(), settings)
}

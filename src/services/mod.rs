// ABOUTME: Chat engine services driving one user turn from request to response
// ABOUTME: Provides the ChatEngine trait, the orchestration and mock engines, and the engine factory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Chat engine services
//!
//! A [`ChatEngine`] turns one [`ChatRequest`] into one [`ChatResponse`].
//! Two implementations exist:
//!
//! - [`OrchestrationEngine`] drives the model/tool loop against the real
//!   model endpoint and tool gateway and persists conversation history.
//! - [`MockEngine`] returns a canned answer without any network call.
//!
//! The streaming variant delivers partial answer text through a bounded
//! channel owned by the caller. The engine drops its sender before it
//! returns, so the reader sees every token before the terminal response.

/// Attachment rendering for the model prompt
pub mod attachments;
/// Model/tool orchestration loop
pub mod chat_orchestration;
/// Deterministic engine for credential-free runs
pub mod mock_engine;
/// Structured payload extraction and answer synthesis
pub mod response_assembler;
/// Per-conversation turn serialization
pub mod turn_locks;

pub use chat_orchestration::{EngineSettings, OrchestrationEngine};
pub use mock_engine::MockEngine;
pub use response_assembler::ResponseAssembler;
pub use turn_locks::TurnLocks;

use std::sync::Arc;
use std::time::Duration;

use adchat_core::errors::{AppError, AppResult};
use adchat_core::models::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::ServerConfig;
use crate::database::ChatStore;
use crate::llm::{OpenAiCompatibleClient, OpenAiCompatibleConfig};
use crate::middleware::RequestContext;
use crate::tools::{HttpToolGateway, HttpToolGatewayConfig, ToolCatalog};

/// Sender half of the token channel used by streaming turns
pub type TokenSender = mpsc::Sender<String>;

/// Engine executing chat turns
#[async_trait]
pub trait ChatEngine: Send + Sync {
    /// Engine identifier used in logs and health output
    fn mode(&self) -> &'static str;

    /// Run one turn and return the complete response
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput`, `ResourceNotFound`, `UpstreamUnavailable`,
    /// `RequestCancelled`, or `DeadlineExceeded` when the turn cannot produce an answer.
    async fn run_turn(&self, ctx: &RequestContext, request: ChatRequest)
        -> AppResult<ChatResponse>;

    /// Run one turn, forwarding partial answer text to `tokens` as it arrives
    ///
    /// The response equals what [`ChatEngine::run_turn`] returns for the same
    /// model and tool behavior.
    ///
    /// # Errors
    ///
    /// Same as [`ChatEngine::run_turn`].
    async fn run_turn_streaming(
        &self,
        ctx: &RequestContext,
        request: ChatRequest,
        tokens: TokenSender,
    ) -> AppResult<ChatResponse>;
}

/// Build the engine selected by configuration
///
/// # Errors
///
/// Returns a configuration error if an HTTP client cannot be created.
pub fn build_engine(
    config: &ServerConfig,
    store: Arc<dyn ChatStore>,
) -> AppResult<Arc<dyn ChatEngine>> {
    if config.engine.mock_mode {
        info!("Mock mode enabled; model and tool gateway will not be contacted");
        return Ok(Arc::new(MockEngine::new(config.engine.mock_answer.clone())));
    }

    let model = OpenAiCompatibleClient::new(OpenAiCompatibleConfig {
        base_url: config.llm.base_url.clone(),
        api_key: config.llm.api_key.clone(),
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        timeout: Duration::from_secs(config.llm.timeout_secs),
    })
    .map_err(|e| AppError::config(e.to_string()))?;

    let gateway = HttpToolGateway::new(HttpToolGatewayConfig {
        base_url: config.gateway.base_url.clone(),
        token: config.gateway.token.clone(),
        timeout: Duration::from_secs(config.gateway.timeout_secs),
    })
    .map_err(|e| AppError::config(e.to_string()))?;

    let catalog = ToolCatalog::new(config.engine.enabled_tools.as_deref());
    info!(tools = ?catalog.names(), model = %config.llm.model, "Orchestration engine ready");

    Ok(Arc::new(OrchestrationEngine::new(
        Arc::new(model),
        Arc::new(gateway),
        store,
        catalog,
        EngineSettings::from_config(&config.engine),
    )))
}

/// Truncate `text` to at most `max_chars` characters
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (text[..byte_index].to_owned(), true),
        None => (text.to_owned(), false),
    }
}

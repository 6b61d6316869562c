// ABOUTME: Orchestration engine running the bounded model/tool loop for one chat turn
// ABOUTME: Loads history, executes tool calls in order, assembles the response, and persists the turn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Orchestration Engine
//!
//! One turn runs through these phases:
//!
//! 1. Load up to `history_window` prior messages when a conversation id is set.
//! 2. Append the user message, with attachments rendered inline.
//! 3. Loop, at most `max_tool_rounds` times: call the model; stop on a final
//!    message; otherwise run each requested tool in order, record a [`Step`]
//!    per call, and feed every result back as a `tool` message.
//! 4. Assemble the response from the closing message and the steps.
//! 5. Persist the user and assistant messages when a conversation id is set.
//!
//! Only a model failure on the first round aborts the turn. Later model
//! failures, tool failures, the round limit, and persistence failures are
//! recorded as steps next to a best-effort answer.
//!
//! The turn as a whole races the caller's cancellation token and the turn
//! deadline; losing either race drops every in-flight model or gateway call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use adchat_core::constants::{limits, steps as step_names};
use adchat_core::errors::{AppError, AppResult, ErrorCode, GatewayError, ModelError};
use adchat_core::models::{ChatRequest, ChatResponse, Message, MessageRole, Step};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn, Instrument, Span};

use super::attachments::render_user_message;
use super::response_assembler::ResponseAssembler;
use super::turn_locks::TurnLocks;
use super::{truncate_chars, ChatEngine, TokenSender};
use crate::config::EngineConfig;
use crate::database::ChatStore;
use crate::llm::{ChatMessage, FunctionDeclaration, ModelClient, ModelEvent, ModelTurn, ToolCall};
use crate::middleware::{create_turn_span, RequestContext};
use crate::tools::{GatewayResponse, ToolCatalog, ToolGatewayClient};

// ============================================================================
// Settings
// ============================================================================

/// Tunables of the orchestration loop
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Maximum model rounds per turn
    pub max_tool_rounds: usize,
    /// History messages loaded per turn
    pub history_window: u32,
    /// Overall turn deadline
    pub turn_timeout: Duration,
    /// Run turns on the same conversation one at a time
    pub serialize_turns: bool,
    /// System prompt sent at the head of every turn
    pub system_prompt: String,
}

impl EngineSettings {
    /// Settings from the engine configuration section
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_tool_rounds: config.max_tool_rounds,
            history_window: config.history_window,
            turn_timeout: config.turn_timeout(),
            serialize_turns: config.serialize_turns,
            system_prompt: config.system_prompt.clone(),
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Engine driving the model/tool loop against live collaborators
pub struct OrchestrationEngine {
    model: Arc<dyn ModelClient>,
    gateway: Arc<dyn ToolGatewayClient>,
    store: Arc<dyn ChatStore>,
    catalog: ToolCatalog,
    settings: EngineSettings,
    turn_locks: TurnLocks,
}

/// Working state of one turn; never shared outside it
struct TurnState {
    messages: Vec<ChatMessage>,
    steps: Vec<Step>,
    final_message: Option<String>,
    rounds: usize,
}

impl OrchestrationEngine {
    /// Create an engine over the given collaborators
    #[must_use]
    pub fn new(
        model: Arc<dyn ModelClient>,
        gateway: Arc<dyn ToolGatewayClient>,
        store: Arc<dyn ChatStore>,
        catalog: ToolCatalog,
        settings: EngineSettings,
    ) -> Self {
        Self {
            model,
            gateway,
            store,
            catalog,
            settings,
            turn_locks: TurnLocks::new(),
        }
    }

    /// Race the turn against cancellation and the turn deadline
    async fn run(
        &self,
        ctx: &RequestContext,
        request: ChatRequest,
        tokens: Option<TokenSender>,
        mode: &'static str,
    ) -> AppResult<ChatResponse> {
        let span = create_turn_span(ctx, request.conversation_id(), mode);
        let started = Instant::now();

        let outcome = async {
            tokio::select! {
                biased;
                () = ctx.cancel.cancelled() => {
                    info!("Turn cancelled by client");
                    Err(AppError::cancelled())
                }
                result = timeout(self.settings.turn_timeout, self.execute_turn(ctx, request, tokens.as_ref())) => {
                    result.unwrap_or_else(|_| {
                        warn!(timeout_secs = self.settings.turn_timeout.as_secs(), "Turn deadline exceeded");
                        Err(AppError::deadline_exceeded(self.settings.turn_timeout.as_secs()))
                    })
                }
            }
        }
        .instrument(span.clone())
        .await;

        span.record("duration_ms", started.elapsed().as_millis());
        outcome.map_err(|e| e.with_request_id(ctx.request_id.clone()))
    }

    async fn execute_turn(
        &self,
        ctx: &RequestContext,
        request: ChatRequest,
        tokens: Option<&TokenSender>,
    ) -> AppResult<ChatResponse> {
        request.validate()?;
        let conversation_id = request.conversation_id().map(ToOwned::to_owned);

        let _turn_guard = match &conversation_id {
            Some(id) if self.settings.serialize_turns => {
                Some(self.turn_locks.acquire(&ctx.caller_key, id).await)
            }
            _ => None,
        };

        let history = match &conversation_id {
            Some(id) => self.load_history(ctx, id).await?,
            None => Vec::new(),
        };

        let user_content = render_user_message(&request)?;
        let mut state = TurnState {
            messages: Vec::with_capacity(history.len() + 2),
            steps: Vec::new(),
            final_message: None,
            rounds: 0,
        };
        state
            .messages
            .push(ChatMessage::system(self.settings.system_prompt.clone()));
        state.messages.extend(history);
        state.messages.push(ChatMessage::user(user_content.clone()));

        self.run_tool_loop(&mut state, tokens).await?;

        let span = Span::current();
        span.record("rounds", state.rounds);
        span.record("steps", state.steps.len());

        let mut response = ResponseAssembler::assemble(state.final_message.as_deref(), state.steps);

        if let Some(id) = &conversation_id {
            if let Err(error) = self
                .persist_turn(ctx, id, &user_content, &response.answer)
                .await
            {
                warn!(error = %error, "Conversation history write failed; returning answer anyway");
                response.steps.push(Step {
                    tool: step_names::PERSIST_HISTORY.to_owned(),
                    campaign_id: None,
                    status: step_names::PERSIST_HISTORY_STATUS,
                    error: Some(error.message),
                    body: None,
                });
            }
        }

        Ok(response)
    }

    /// Load prior messages, oldest first
    ///
    /// A conversation owned by another key aborts the turn. Any other store
    /// failure degrades to an empty history.
    async fn load_history(&self, ctx: &RequestContext, conversation_id: &str) -> AppResult<Vec<ChatMessage>> {
        match self
            .store
            .list_messages(&ctx.caller_key, conversation_id, self.settings.history_window)
            .await
        {
            Ok(messages) => {
                debug!(count = messages.len(), "Loaded conversation history");
                Ok(messages.iter().filter_map(history_message).collect())
            }
            Err(error) if error.code == ErrorCode::ResourceNotFound => Err(error),
            Err(error) => {
                warn!(error = %error, "Conversation history unavailable; continuing without it");
                Ok(Vec::new())
            }
        }
    }

    async fn persist_turn(
        &self,
        ctx: &RequestContext,
        conversation_id: &str,
        user_content: &str,
        answer: &str,
    ) -> AppResult<()> {
        self.store
            .append_messages(
                &ctx.caller_key,
                conversation_id,
                &[
                    (MessageRole::User, user_content),
                    (MessageRole::Assistant, answer),
                ],
            )
            .await?;
        debug!("Persisted turn to conversation history");
        Ok(())
    }

    async fn run_tool_loop(&self, state: &mut TurnState, tokens: Option<&TokenSender>) -> AppResult<()> {
        let declarations = self.catalog.declarations();

        for round in 0..self.settings.max_tool_rounds {
            state.rounds = round + 1;

            let turn = match self.call_model(&state.messages, declarations, tokens).await {
                Ok(turn) => turn,
                Err(error) if round == 0 => {
                    warn!(round, error = %error, "Model unavailable on first round");
                    return Err(error.into());
                }
                Err(error) => {
                    warn!(round, error = %error, "Model call failed; answering with partial results");
                    state.steps.push(Step {
                        tool: step_names::MODEL.to_owned(),
                        campaign_id: None,
                        status: error.step_status(),
                        error: Some(error.to_string()),
                        body: None,
                    });
                    return Ok(());
                }
            };

            match turn {
                ModelTurn::Final { content, finish_reason } => {
                    debug!(round, ?finish_reason, "Model produced final answer");
                    state.final_message = Some(content);
                    return Ok(());
                }
                ModelTurn::ToolCalls { content, calls } => {
                    info!(round, calls = calls.len(), "Model requested tool calls");
                    let content = content.unwrap_or_default();
                    if !content.trim().is_empty() {
                        // Best answer so far if the loop ends before a final message
                        state.final_message = Some(content.clone());
                    }
                    state
                        .messages
                        .push(ChatMessage::assistant_tool_calls(content, calls.clone()));
                    for call in &calls {
                        let (step, result) = self.execute_tool_call(round, call).await;
                        state.steps.push(step);
                        state.messages.push(ChatMessage::tool_result(&call.id, result));
                    }
                }
            }
        }

        warn!(
            max_rounds = self.settings.max_tool_rounds,
            "Round limit reached without a final answer"
        );
        state.steps.push(Step {
            tool: step_names::ROUND_LIMIT.to_owned(),
            campaign_id: None,
            status: step_names::ROUND_LIMIT_STATUS,
            error: Some(format!(
                "round limit of {} reached without a final answer",
                self.settings.max_tool_rounds
            )),
            body: None,
        });
        Ok(())
    }

    /// One model call; streaming calls forward tokens as they arrive
    async fn call_model(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionDeclaration],
        tokens: Option<&TokenSender>,
    ) -> Result<ModelTurn, ModelError> {
        let Some(tokens) = tokens else {
            return self.model.complete(messages, tools).await;
        };

        let mut stream = self.model.complete_stream(messages, tools).await?;
        while let Some(event) = stream.next().await {
            match event? {
                ModelEvent::Token(text) => {
                    if tokens.send(text).await.is_err() {
                        debug!("Token receiver dropped");
                    }
                }
                ModelEvent::Completed(turn) => return Ok(turn),
            }
        }
        Err(ModelError::MalformedResponse(
            "stream ended without a completed turn".to_owned(),
        ))
    }

    /// Resolve and run one tool call, returning its step and the text fed back to the model
    async fn execute_tool_call(&self, round: usize, call: &ToolCall) -> (Step, String) {
        let started = Instant::now();

        let tool = match self.catalog.resolve(&call.name, &call.arguments) {
            Ok(tool) => tool,
            Err(error) => {
                warn!(round, tool = %call.name, error = %error, "Rejected tool call");
                return gateway_failure(&call.name, argument_campaign_id(&call.arguments), &error);
            }
        };
        let campaign_id = tool.campaign_id().map(ToOwned::to_owned);

        let outcome = self.gateway.invoke(&tool).await;
        let duration_ms = started.elapsed().as_millis();

        match outcome {
            Ok(response) => {
                info!(round, tool = tool.name(), status = response.status, duration_ms, "Tool call completed");
                gateway_result(tool.name(), campaign_id, &response)
            }
            Err(error) => {
                warn!(round, tool = tool.name(), error = %error, duration_ms, "Tool call failed");
                gateway_failure(tool.name(), campaign_id, &error)
            }
        }
    }
}

// ============================================================================
// Step Construction
// ============================================================================

fn history_message(message: &Message) -> Option<ChatMessage> {
    match message.role {
        MessageRole::User => Some(ChatMessage::user(message.content.clone())),
        MessageRole::Assistant => Some(ChatMessage::assistant(message.content.clone())),
        MessageRole::System | MessageRole::Tool => None,
    }
}

/// Campaign id as written by the model, for steps whose arguments failed to resolve
fn argument_campaign_id(arguments: &Value) -> Option<String> {
    match arguments.get("campaign_id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Parse a gateway body; non-JSON bodies are kept verbatim as a string
fn parse_body(body: &Bytes) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned())),
    )
}

fn gateway_result(tool: &str, campaign_id: Option<String>, response: &GatewayResponse) -> (Step, String) {
    let (text, _) = truncate_chars(&String::from_utf8_lossy(&response.body), limits::MAX_TOOL_RESULT_CHARS);

    let (error, result) = if response.is_success() {
        (None, text)
    } else {
        let error = format!("tool gateway returned status {}", response.status);
        let result = json!({"error": error, "status": response.status, "body": text}).to_string();
        (Some(error), result)
    };

    let step = Step {
        tool: tool.to_owned(),
        campaign_id,
        status: response.status,
        error,
        body: parse_body(&response.body),
    };
    (step, result)
}

fn gateway_failure(tool: &str, campaign_id: Option<String>, error: &GatewayError) -> (Step, String) {
    let step = Step {
        tool: tool.to_owned(),
        campaign_id,
        status: error.step_status(),
        error: Some(error.to_string()),
        body: None,
    };
    let result = json!({"error": error.to_string(), "status": error.step_status()}).to_string();
    (step, result)
}

#[async_trait]
impl ChatEngine for OrchestrationEngine {
    fn mode(&self) -> &'static str {
        "orchestration"
    }

    async fn run_turn(&self, ctx: &RequestContext, request: ChatRequest) -> AppResult<ChatResponse> {
        self.run(ctx, request, None, "blocking").await
    }

    async fn run_turn_streaming(
        &self,
        ctx: &RequestContext,
        request: ChatRequest,
        tokens: TokenSender,
    ) -> AppResult<ChatResponse> {
        self.run(ctx, request, Some(tokens), "streaming").await
    }
}

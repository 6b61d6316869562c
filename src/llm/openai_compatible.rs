// ABOUTME: OpenAI-compatible chat completions client with function calling
// ABOUTME: Supports blocking and streamed turns, accumulating streamed tool-call deltas by index
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `OpenAI`-Compatible Client
//!
//! Implements [`ModelClient`] against any endpoint that speaks the `OpenAI`
//! chat completions protocol (`POST {base}/chat/completions`).
//!
//! - Tool schema is sent as `tools` with `tool_choice: "auto"`.
//! - Assistant tool calls and `tool` role results are sent back verbatim so
//!   the endpoint can correlate them by `tool_call_id`.
//! - Streaming responses arrive as SSE `data:` lines; content deltas become
//!   [`ModelEvent::Token`] items while tool-call fragments are merged per
//!   `index` until the stream finishes.
//!
//! Failures are reported by kind: transport, timeout, non-success status,
//! or malformed body. The client never retries.

use std::collections::BTreeMap;
use std::time::Duration;

use adchat_core::errors::ModelError;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::sse_parser::{sse_events, SseEvent};
use super::{
    ChatMessage, FunctionDeclaration, MessageRole, ModelClient, ModelEvent, ModelEventStream,
    ModelTurn, ToolCall,
};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Connection establishment deadline
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Characters of an unparseable error body kept in the error message
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

// ============================================================================
// API Request/Response Types (OpenAI-compatible format)
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
            msg.tool_calls
                .iter()
                .map(|call| OpenAiToolCall {
                    id: call.id.clone(),
                    call_type: "function".to_owned(),
                    function: OpenAiFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect()
        });
        // Assistant messages that only carry tool calls send `content: null`
        let content = if tool_calls.is_some() && msg.content.is_empty() {
            None
        } else {
            Some(msg.content.clone())
        };
        Self {
            role: msg.role.as_str(),
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

fn function_type() -> String {
    "function".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<OpenAiFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the `OpenAI`-compatible client
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Bearer key (optional for local servers)
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Deadline for a blocking call, and for each chunk of a streamed call
    pub timeout: Duration,
}

// ============================================================================
// Client Implementation
// ============================================================================

/// Model client for `OpenAI`-compatible endpoints
pub struct OpenAiCompatibleClient {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleClient {
    /// Create a new client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ModelError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout.as_secs()
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionDeclaration],
        stream: bool,
    ) -> OpenAiRequest {
        let tools = (!tools.is_empty()).then(|| {
            tools
                .iter()
                .map(|decl| OpenAiTool {
                    tool_type: "function",
                    function: OpenAiFunction {
                        name: decl.name.clone(),
                        description: decl.description.clone(),
                        parameters: decl.parameters.clone(),
                    },
                })
                .collect::<Vec<_>>()
        });

        OpenAiRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(OpenAiMessage::from).collect(),
            temperature: self.config.temperature,
            stream: Some(stream),
            tool_choice: tools.as_ref().map(|_| "auto"),
            tools,
        }
    }

    fn map_send_error(&self, error: &reqwest::Error) -> ModelError {
        if error.is_timeout() {
            ModelError::Timeout {
                after_secs: self.timeout_secs(),
            }
        } else if error.is_connect() {
            ModelError::Transport(format!(
                "cannot connect to model endpoint at {}: {error}",
                self.config.base_url
            ))
        } else {
            ModelError::Transport(error.to_string())
        }
    }

    /// Send the request and return the response once a success status is seen
    async fn send(&self, request: &OpenAiRequest, stream: bool) -> Result<Response, ModelError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            stream,
            "Sending chat completion request"
        );

        let mut builder = self.client.post(self.api_url("chat/completions")).json(request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        // Streamed calls bound the handshake here and each chunk in the SSE reader
        let response = if stream {
            timeout(self.config.timeout, builder.send())
                .await
                .map_err(|_| ModelError::Timeout {
                    after_secs: self.timeout_secs(),
                })?
        } else {
            builder.timeout(self.config.timeout).send().await
        }
        .map_err(|e| self.map_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error_response(status.as_u16(), &body));
        }
        Ok(response)
    }
}

/// Build a status error from a non-success response body
fn parse_error_response(status: u16, body: &str) -> ModelError {
    let message = serde_json::from_str::<OpenAiErrorResponse>(body).map_or_else(
        |_| body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
        |parsed| parsed.error.message,
    );
    warn!(status, %message, "Model endpoint returned an error status");
    ModelError::Status { status, message }
}

/// Parse tool-call argument text; empty text means no arguments
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

fn turn_from_parts(
    content: Option<String>,
    calls: Vec<ToolCall>,
    finish_reason: Option<String>,
) -> ModelTurn {
    if calls.is_empty() {
        ModelTurn::Final {
            content: content.unwrap_or_default(),
            finish_reason,
        }
    } else {
        ModelTurn::ToolCalls {
            content: content.filter(|text| !text.is_empty()),
            calls,
        }
    }
}

// ============================================================================
// Stream Accumulation
// ============================================================================

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Merges streamed deltas into the final turn
#[derive(Debug, Default)]
struct StreamAccumulator {
    content: String,
    tool_calls: BTreeMap<usize, PartialToolCall>,
    finish_reason: Option<String>,
}

impl StreamAccumulator {
    /// Apply one chunk, returning the content delta to forward, if any
    fn apply(&mut self, chunk: OpenAiStreamChunk) -> Option<String> {
        let mut token = String::new();
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content {
                token.push_str(&content);
            }
            for delta in choice.delta.tool_calls.unwrap_or_default() {
                let entry = self.tool_calls.entry(delta.index).or_default();
                if let Some(id) = delta.id {
                    entry.id = id;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        entry.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        entry.arguments.push_str(&arguments);
                    }
                }
            }
            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason;
            }
        }
        self.content.push_str(&token);
        (!token.is_empty()).then_some(token)
    }

    fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }

    fn finish(self) -> ModelTurn {
        let calls = self
            .tool_calls
            .into_iter()
            .map(|(index, call)| ToolCall {
                id: if call.id.is_empty() {
                    format!("call_{index}")
                } else {
                    call.id
                },
                name: call.name,
                arguments: parse_arguments(&call.arguments),
            })
            .collect();
        turn_from_parts(Some(self.content), calls, self.finish_reason)
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatibleClient {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionDeclaration],
    ) -> Result<ModelTurn, ModelError> {
        let request = self.build_request(messages, tools, false);
        let response = self.send(&request, false).await?;

        let body = response.text().await.map_err(|e| self.map_send_error(&e))?;
        let parsed: OpenAiResponse = serde_json::from_str(&body)
            .map_err(|e| ModelError::MalformedResponse(format!("invalid JSON body: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::MalformedResponse("response has no choices".to_owned()))?;

        let calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: parse_arguments(&call.function.arguments),
            })
            .collect();

        debug!(
            content_len = choice.message.content.as_ref().map_or(0, String::len),
            tool_calls = calls.len(),
            finish_reason = ?choice.finish_reason,
            "Received chat completion"
        );

        Ok(turn_from_parts(
            choice.message.content,
            calls,
            choice.finish_reason,
        ))
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionDeclaration],
    ) -> Result<ModelEventStream, ModelError> {
        let request = self.build_request(messages, tools, true);
        let response = self.send(&request, true).await?;
        let mut events = sse_events(response.bytes_stream(), self.config.timeout);

        let stream = async_stream::stream! {
            let mut accumulator = StreamAccumulator::default();
            let mut saw_done = false;

            while let Some(item) = events.next().await {
                match item {
                    Ok(SseEvent::Data(json)) => {
                        match serde_json::from_str::<OpenAiStreamChunk>(&json) {
                            Ok(chunk) => {
                                if let Some(token) = accumulator.apply(chunk) {
                                    yield Ok(ModelEvent::Token(token));
                                }
                            }
                            Err(e) => warn!("Skipping unparseable stream chunk: {e}"),
                        }
                    }
                    Ok(SseEvent::Done) => {
                        saw_done = true;
                        break;
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if saw_done || accumulator.is_finished() {
                yield Ok(ModelEvent::Completed(accumulator.finish()));
            } else {
                yield Err(ModelError::MalformedResponse(
                    "stream ended before the model finished".to_owned(),
                ));
            }
        };

        Ok(Box::pin(stream))
    }
}

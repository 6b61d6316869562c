// ABOUTME: Model client abstraction for tool-calling chat completions
// ABOUTME: Defines messages, tool declarations, model turns, and the streaming event contract
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Model Client Interface
//!
//! The orchestration engine talks to the inference endpoint only through
//! [`ModelClient`]. A call receives the working message list plus the static
//! tool schema and concludes with a [`ModelTurn`]: either a finished assistant
//! message or a set of requested tool calls.
//!
//! ## Streaming
//!
//! [`ModelClient::complete_stream`] returns an ordered event stream consumed by
//! a single reader. Zero or more [`ModelEvent::Token`] items carry partial
//! answer text, followed by exactly one [`ModelEvent::Completed`] holding the
//! same `ModelTurn` the blocking call would have produced.
//!
//! ```rust,no_run
//! use adchat_server::llm::{ChatMessage, ModelClient, ModelTurn};
//!
//! async fn example(client: &dyn ModelClient) {
//!     let messages = vec![
//!         ChatMessage::system("You answer campaign analytics questions."),
//!         ChatMessage::user("How many impressions did campaign 42 get?"),
//!     ];
//!     if let Ok(ModelTurn::Final { content, .. }) = client.complete(&messages, &[]).await {
//!         println!("{content}");
//!     }
//! }
//! ```

mod openai_compatible;
pub mod prompts;
pub mod sse_parser;

pub use adchat_core::models::MessageRole;
pub use openai_compatible::{OpenAiCompatibleClient, OpenAiCompatibleConfig};
pub use prompts::default_system_prompt;

use std::pin::Pin;

use adchat_core::errors::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::Stream;

// ============================================================================
// Message Types
// ============================================================================

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back on the tool result
    pub id: String,
    /// Requested tool name
    pub name: String,
    /// Arguments as sent by the model; non-JSON argument text is kept as a string
    pub arguments: Value,
}

/// A single message in the working conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
    /// Tool calls carried by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call id answered by a tool message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create an assistant message that requests tool calls
    #[must_use]
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::new(MessageRole::Assistant, content)
        }
    }

    /// Create a tool result message answering `call_id`
    #[must_use]
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::new(MessageRole::Tool, content)
        }
    }
}

/// Function declaration advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Tool name
    pub name: String,
    /// What the tool does
    pub description: String,
    /// JSON schema of the arguments
    pub parameters: Value,
}

// ============================================================================
// Turn Results
// ============================================================================

/// How one model call concluded
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// A finished assistant message with no tool calls
    Final {
        /// Answer text
        content: String,
        /// Provider finish reason
        finish_reason: Option<String>,
    },
    /// One or more tool calls, in the order the model returned them
    ToolCalls {
        /// Assistant text emitted alongside the calls
        content: Option<String>,
        /// Requested calls
        calls: Vec<ToolCall>,
    },
}

/// Item of a streaming model call
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// Partial answer text
    Token(String),
    /// Terminal result of the call
    Completed(ModelTurn),
}

/// Stream type for streaming model calls
pub type ModelEventStream = Pin<Box<dyn Stream<Item = Result<ModelEvent, ModelError>> + Send>>;

// ============================================================================
// Client Trait
// ============================================================================

/// Model inference client
///
/// Implementations perform exactly one outbound call per invocation and
/// never retry; retry and fallback policy belongs to the caller.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Client identifier used in logs
    fn name(&self) -> &'static str;

    /// Run one blocking completion
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionDeclaration],
    ) -> Result<ModelTurn, ModelError>;

    /// Run one streaming completion
    ///
    /// Errors before the first byte are returned directly; errors mid-stream
    /// are yielded as stream items.
    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionDeclaration],
    ) -> Result<ModelEventStream, ModelError>;
}

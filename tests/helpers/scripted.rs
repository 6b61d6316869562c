// ABOUTME: Scripted model client, recording tool gateway, and fault-injecting store for tests
// ABOUTME: Lets engine tests drive exact model/tool sequences without network access
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adchat_server::database::ChatStore;
use adchat_server::errors::{AppError, AppResult, GatewayError, ModelError};
use adchat_server::llm::{
    ChatMessage, FunctionDeclaration, ModelClient, ModelEvent, ModelEventStream, ModelTurn,
    ToolCall,
};
use adchat_server::models::{Conversation, Message, MessageRole};
use adchat_server::tools::{GatewayResponse, GatewayTool, ToolGatewayClient};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

// ============================================================================
// Scripted Model
// ============================================================================

/// Model client that replays a fixed sequence of turns
pub struct ScriptedModelClient {
    script: Mutex<VecDeque<Result<ModelTurn, ModelError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    delay: Option<Duration>,
}

impl ScriptedModelClient {
    pub fn new(script: Vec<Result<ModelTurn, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Message lists received so far, one entry per call
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn next_turn(&self, messages: &[ChatMessage]) -> Result<ModelTurn, ModelError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::MalformedResponse("script exhausted".to_owned())))
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[FunctionDeclaration],
    ) -> Result<ModelTurn, ModelError> {
        self.next_turn(messages).await
    }

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        _tools: &[FunctionDeclaration],
    ) -> Result<ModelEventStream, ModelError> {
        let turn = self.next_turn(messages).await?;

        let mut events: Vec<Result<ModelEvent, ModelError>> = Vec::new();
        if let ModelTurn::Final { content, .. } = &turn {
            events.extend(
                content
                    .split_inclusive(' ')
                    .map(|chunk| Ok(ModelEvent::Token(chunk.to_owned()))),
            );
        }
        events.push(Ok(ModelEvent::Completed(turn)));

        Ok(Box::pin(tokio_stream::iter(events)))
    }
}

/// Final answer turn
pub fn final_turn(content: &str) -> Result<ModelTurn, ModelError> {
    Ok(ModelTurn::Final {
        content: content.to_owned(),
        finish_reason: Some("stop".to_owned()),
    })
}

/// Turn requesting the given `(name, arguments)` calls
pub fn tool_turn(calls: &[(&str, Value)]) -> Result<ModelTurn, ModelError> {
    Ok(ModelTurn::ToolCalls {
        content: None,
        calls: calls
            .iter()
            .enumerate()
            .map(|(index, (name, arguments))| ToolCall {
                id: format!("call_{index}"),
                name: (*name).to_owned(),
                arguments: arguments.clone(),
            })
            .collect(),
    })
}

// ============================================================================
// Recording Gateway
// ============================================================================

/// Gateway returning canned responses per tool name and recording each call
pub struct RecordingGateway {
    responses: HashMap<String, Result<GatewayResponse, GatewayError>>,
    invocations: Mutex<Vec<GatewayTool>>,
    delay: Option<Duration>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            invocations: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Answer `tool` with `status` and a JSON body
    pub fn respond(mut self, tool: &str, status: u16, body: &Value) -> Self {
        self.responses.insert(
            tool.to_owned(),
            Ok(GatewayResponse {
                status,
                body: Bytes::from(body.to_string()),
            }),
        );
        self
    }

    /// Answer `tool` with a raw body
    pub fn respond_raw(mut self, tool: &str, status: u16, body: &'static str) -> Self {
        self.responses.insert(
            tool.to_owned(),
            Ok(GatewayResponse {
                status,
                body: Bytes::from_static(body.as_bytes()),
            }),
        );
        self
    }

    /// Fail `tool` with a gateway error
    pub fn fail(mut self, tool: &str, error: GatewayError) -> Self {
        self.responses.insert(tool.to_owned(), Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<GatewayTool> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolGatewayClient for RecordingGateway {
    async fn invoke(&self, tool: &GatewayTool) -> Result<GatewayResponse, GatewayError> {
        self.invocations.lock().unwrap().push(tool.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses.get(tool.name()).cloned().unwrap_or_else(|| {
            Ok(GatewayResponse {
                status: 404,
                body: Bytes::from_static(br#"{"error":"no canned response"}"#),
            })
        })
    }
}

// ============================================================================
// Fault-Injecting Store
// ============================================================================

/// Store wrapper that can fail reads or writes and counts append calls
pub struct FaultyStore {
    inner: Arc<dyn ChatStore>,
    fail_appends: bool,
    fail_lists: bool,
    fail_lookups: bool,
    appends: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn ChatStore>) -> Self {
        Self {
            inner,
            fail_appends: false,
            fail_lists: false,
            fail_lookups: false,
            appends: AtomicUsize::new(0),
        }
    }

    pub fn failing_appends(mut self) -> Self {
        self.fail_appends = true;
        self
    }

    pub fn failing_lists(mut self) -> Self {
        self.fail_lists = true;
        self
    }

    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn append_calls(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatStore for FaultyStore {
    async fn create_conversation(&self, owner_key: &str) -> AppResult<Conversation> {
        self.inner.create_conversation(owner_key).await
    }

    async fn get_conversation(
        &self,
        owner_key: &str,
        conversation_id: &str,
    ) -> AppResult<Option<Conversation>> {
        if self.fail_lookups {
            return Err(AppError::database("database is locked"));
        }
        self.inner.get_conversation(owner_key, conversation_id).await
    }

    async fn append_messages(
        &self,
        owner_key: &str,
        conversation_id: &str,
        messages: &[(MessageRole, &str)],
    ) -> AppResult<Vec<Message>> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        if self.fail_appends {
            return Err(AppError::database("disk I/O error"));
        }
        self.inner
            .append_messages(owner_key, conversation_id, messages)
            .await
    }

    async fn list_messages(
        &self,
        owner_key: &str,
        conversation_id: &str,
        limit: u32,
    ) -> AppResult<Vec<Message>> {
        if self.fail_lists {
            return Err(AppError::database("database is locked"));
        }
        self.inner
            .list_messages(owner_key, conversation_id, limit)
            .await
    }

    async fn ping(&self) -> AppResult<()> {
        self.inner.ping().await
    }
}

// ABOUTME: Canned-answer engine used when the server runs without a model endpoint
// ABOUTME: Never contacts the model, the tool gateway, or the conversation store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use adchat_core::errors::AppResult;
use adchat_core::models::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use tracing::{debug, Instrument};

use super::{ChatEngine, TokenSender};
use crate::middleware::{create_turn_span, RequestContext};

/// Engine returning a fixed answer for every turn
pub struct MockEngine {
    answer: String,
}

impl MockEngine {
    /// Create a mock engine answering with `answer`
    #[must_use]
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }

    fn response(&self) -> ChatResponse {
        ChatResponse {
            answer: self.answer.clone(),
            data: None,
            steps: Vec::new(),
        }
    }
}

#[async_trait]
impl ChatEngine for MockEngine {
    fn mode(&self) -> &'static str {
        "mock"
    }

    async fn run_turn(&self, ctx: &RequestContext, request: ChatRequest) -> AppResult<ChatResponse> {
        let span = create_turn_span(ctx, request.conversation_id(), "mock");
        async move {
            request.validate()?;
            debug!("Serving canned answer");
            Ok(self.response())
        }
        .instrument(span)
        .await
    }

    async fn run_turn_streaming(
        &self,
        ctx: &RequestContext,
        request: ChatRequest,
        tokens: TokenSender,
    ) -> AppResult<ChatResponse> {
        let span = create_turn_span(ctx, request.conversation_id(), "mock");
        async move {
            request.validate()?;
            for chunk in self.answer.split_inclusive(' ') {
                if tokens.send(chunk.to_owned()).await.is_err() {
                    debug!("Token receiver dropped");
                    break;
                }
            }
            Ok(self.response())
        }
        .instrument(span)
        .await
    }
}

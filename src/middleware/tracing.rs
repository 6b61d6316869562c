// ABOUTME: Per-request context carrying the request ID, caller key, and cancellation token
// ABOUTME: Replaces ambient request state with an explicit object passed through the engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use adchat_core::constants::headers as header_names;
use adchat_core::errors::AppResult;
use http::HeaderMap;
use tokio_util::sync::CancellationToken;
use tracing::{field, info_span, Span};
use uuid::Uuid;

use super::auth::extract_caller_key;
use super::redaction::redact_caller_key;

/// Request context that flows through the entire turn
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id, taken from `x-request-id` or generated
    pub request_id: String,
    /// Key that owns any conversation touched by the request
    pub caller_key: String,
    /// Cancelled when the client goes away
    pub cancel: CancellationToken,
}

impl RequestContext {
    /// Create a context with a generated request ID
    #[must_use]
    pub fn new(caller_key: impl Into<String>) -> Self {
        Self {
            request_id: format!("req_{}", Uuid::new_v4().simple()),
            caller_key: caller_key.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the generated request ID
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Build the context from inbound headers
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when no caller key is present.
    pub fn from_headers(headers: &HeaderMap) -> AppResult<Self> {
        let caller_key = extract_caller_key(headers)?;
        let context = Self::new(caller_key);

        Ok(
            match headers
                .get(header_names::REQUEST_ID)
                .and_then(|value| value.to_str().ok())
                .filter(|id| !id.is_empty())
            {
                Some(request_id) => context.with_request_id(request_id),
                None => context,
            },
        )
    }

    /// Caller key reduced to a log-safe prefix
    #[must_use]
    pub fn caller_label(&self) -> String {
        redact_caller_key(&self.caller_key)
    }

    /// Whether the client has gone away
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Create a tracing span for one chat turn
pub fn create_turn_span(
    context: &RequestContext,
    conversation_id: Option<&str>,
    mode: &'static str,
) -> Span {
    info_span!(
        "chat_turn",
        request_id = %context.request_id,
        caller = %context.caller_label(),
        conversation_id = conversation_id.unwrap_or("-"),
        mode,
        rounds = field::Empty,
        steps = field::Empty,
        duration_ms = field::Empty,
    )
}

// ABOUTME: Chat route handlers for blocking and streamed turns plus conversation management
// ABOUTME: Validates requests, derives the caller context, and delegates turns to the engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Chat routes
//!
//! Every handler requires a caller key (`x-api-key` or bearer token). Turn
//! requests are validated here, before the engine is touched.
//!
//! The streaming endpoint emits `token` events with `{"text": ...}`, then
//! exactly one terminal `final` (the full response) or `error` event.
//! Dropping either handler, or the event stream, cancels the turn.

use std::convert::Infallible;
use std::sync::Arc;

use adchat_core::constants::limits;
use adchat_core::errors::{AppError, AppResult, ErrorResponse};
use adchat_core::models::{ChatRequest, ChatResponse, Message};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::middleware::RequestContext;
use crate::server::ServerResources;

/// Tokens buffered between the engine and a slow SSE client
const TOKEN_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing messages
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    /// Maximum messages to return, newest kept
    pub limit: Option<u32>,
}

/// Messages of one conversation, oldest first
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesListResponse {
    /// Ordered messages
    pub messages: Vec<Message>,
}

// ============================================================================
// Chat Routes
// ============================================================================

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat", post(Self::chat))
            .route("/api/chat/stream", post(Self::chat_stream))
            .route("/api/chat/conversations", post(Self::create_conversation))
            .route(
                "/api/chat/conversations/:conversation_id",
                get(Self::get_conversation),
            )
            .route(
                "/api/chat/conversations/:conversation_id/messages",
                get(Self::get_messages),
            )
            .with_state(resources)
    }

    /// Parse the body and validate it before the engine is involved
    fn accept_request(
        ctx: &RequestContext,
        payload: Result<Json<ChatRequest>, JsonRejection>,
    ) -> AppResult<ChatRequest> {
        let Json(request) = payload.map_err(|rejection| {
            AppError::invalid_input(rejection.body_text()).with_request_id(ctx.request_id.clone())
        })?;
        request
            .validate()
            .map_err(|e| e.with_request_id(ctx.request_id.clone()))?;
        Ok(request)
    }

    // ========================================================================
    // Turn Handlers
    // ========================================================================

    /// Run one blocking turn
    async fn chat(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        payload: Result<Json<ChatRequest>, JsonRejection>,
    ) -> Result<Json<ChatResponse>, AppError> {
        let ctx = RequestContext::from_headers(&headers)?;
        let request = Self::accept_request(&ctx, payload)?;
        let _cancel_on_drop = ctx.cancel.clone().drop_guard();

        let response = resources.engine.run_turn(&ctx, request).await?;
        Ok(Json(response))
    }

    /// Run one turn and stream partial tokens over SSE
    async fn chat_stream(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        payload: Result<Json<ChatRequest>, JsonRejection>,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
        let ctx = RequestContext::from_headers(&headers)?;
        let request = Self::accept_request(&ctx, payload)?;

        let (tokens, mut token_rx) = mpsc::channel::<String>(TOKEN_CHANNEL_CAPACITY);
        let cancel_on_drop = ctx.cancel.clone().drop_guard();
        let request_id = ctx.request_id.clone();
        let engine = Arc::clone(&resources.engine);

        let turn = tokio::spawn(async move { engine.run_turn_streaming(&ctx, request, tokens).await });

        let stream = async_stream::stream! {
            let _cancel_on_drop = cancel_on_drop;

            while let Some(text) = token_rx.recv().await {
                yield Ok(Event::default().event("token").data(json!({ "text": text }).to_string()));
            }

            let outcome = turn.await.unwrap_or_else(|e| {
                error!(error = %e, "Streaming turn task failed");
                Err(AppError::internal("Streaming turn failed").with_request_id(request_id.clone()))
            });

            yield Ok(match outcome {
                Ok(response) => terminal_event("final", &response),
                Err(e) => {
                    debug!(code = %e.code, "Streaming turn ended with error");
                    terminal_event("error", &ErrorResponse::from(e))
                }
            });
        };

        Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
    }

    // ========================================================================
    // Conversation Handlers
    // ========================================================================

    /// Create a new conversation owned by the caller
    async fn create_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let ctx = RequestContext::from_headers(&headers)?;
        let conversation = resources
            .store
            .create_conversation(&ctx.caller_key)
            .await
            .map_err(|e| e.with_request_id(ctx.request_id.clone()))?;

        Ok((StatusCode::CREATED, Json(conversation)).into_response())
    }

    /// Get conversation metadata
    async fn get_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<String>,
    ) -> Result<Response, AppError> {
        let ctx = RequestContext::from_headers(&headers)?;
        let conversation = resources
            .store
            .get_conversation(&ctx.caller_key, &conversation_id)
            .await
            .map_err(|e| e.with_request_id(ctx.request_id.clone()))?
            .ok_or_else(|| AppError::not_found("Conversation").with_request_id(ctx.request_id.clone()))?;

        Ok((StatusCode::OK, Json(conversation)).into_response())
    }

    /// Get messages for a conversation, oldest first
    async fn get_messages(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<String>,
        Query(query): Query<MessagesQuery>,
    ) -> Result<Response, AppError> {
        let ctx = RequestContext::from_headers(&headers)?;

        resources
            .store
            .get_conversation(&ctx.caller_key, &conversation_id)
            .await
            .map_err(|e| e.with_request_id(ctx.request_id.clone()))?
            .ok_or_else(|| AppError::not_found("Conversation").with_request_id(ctx.request_id.clone()))?;

        let limit = query.limit.unwrap_or(limits::DEFAULT_MESSAGES_LIMIT);
        let messages = resources
            .store
            .list_messages(&ctx.caller_key, &conversation_id, limit)
            .await
            .map_err(|e| e.with_request_id(ctx.request_id.clone()))?;

        Ok((StatusCode::OK, Json(MessagesListResponse { messages })).into_response())
    }
}

/// Serialize a terminal SSE event; serialization of these types cannot fail in practice
fn terminal_event<T: Serialize>(name: &str, payload: &T) -> Event {
    let data = serde_json::to_string(payload).unwrap_or_else(|e| {
        json!({ "error": "SERIALIZATION_ERROR", "message": e.to_string() }).to_string()
    });
    Event::default().event(name).data(data)
}

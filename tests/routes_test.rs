// ABOUTME: HTTP tests for chat, conversation, and health routes
// ABOUTME: Exercises the full router with scripted collaborators via tower oneshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use std::sync::Arc;

use adchat_server::config::ServerConfig;
use adchat_server::database::ChatStore;
use adchat_server::errors::{ErrorResponse, ModelError};
use adchat_server::models::{ChatResponse, Conversation, MessageRole};
use adchat_server::routes::chat::MessagesListResponse;
use adchat_server::server::{build_router, ServerResources};
use adchat_server::services::{ChatEngine, MockEngine};
use axum::Router;
use helpers::axum_test::AxumTestRequest;
use helpers::scripted::{final_turn, tool_turn, FaultyStore, RecordingGateway, ScriptedModelClient};
use serde_json::{json, Value};

const CALLER: &str = "caller-key-0001";

async fn router_with(model: ScriptedModelClient, gateway: RecordingGateway) -> (Router, Arc<ScriptedModelClient>) {
    let model = Arc::new(model);
    let store = common::create_test_store().await;
    let engine: Arc<dyn ChatEngine> = Arc::new(common::create_engine(
        model.clone(),
        Arc::new(gateway),
        store.clone(),
        common::test_settings(),
    ));
    let resources = Arc::new(ServerResources::new(ServerConfig::default(), store, engine));
    (build_router(&resources), model)
}

async fn mock_router() -> (Router, Arc<dyn ChatStore>) {
    let store: Arc<dyn ChatStore> = common::create_test_store().await;
    let engine: Arc<dyn ChatEngine> = Arc::new(MockEngine::new("Mock answer for testing."));
    let resources = Arc::new(ServerResources::new(
        ServerConfig::default(),
        Arc::clone(&store),
        engine,
    ));
    (build_router(&resources), store)
}

// ============================================================================
// Blocking Turns
// ============================================================================

#[tokio::test]
async fn test_chat_returns_answer_and_steps() {
    let (app, _) = router_with(
        ScriptedModelClient::new(vec![
            tool_turn(&[("get_impressions", json!({"campaign_id": "X"}))]),
            final_turn("Campaign X received 1200 impressions."),
        ]),
        RecordingGateway::new().respond(
            "get_impressions",
            200,
            &json!({"campaign_id": "X", "impressions": 1200, "posters": []}),
        ),
    )
    .await;

    let response = AxumTestRequest::post("/api/chat")
        .api_key(CALLER)
        .json(&json!({"message": "impressions for X"}))
        .send(app)
        .await;

    assert_eq!(response.status(), 200);
    let body: ChatResponse = response.json();
    assert_eq!(body.answer, "Campaign X received 1200 impressions.");
    assert_eq!(body.steps.len(), 1);
    let impressions = body.data.unwrap().campaign_impressions.unwrap();
    assert_eq!(impressions.impressions, 1200);
}

#[tokio::test]
async fn test_empty_message_rejected_before_engine() {
    let (app, model) = router_with(
        ScriptedModelClient::new(vec![final_turn("unused")]),
        RecordingGateway::new(),
    )
    .await;

    let response = AxumTestRequest::post("/api/chat")
        .api_key(CALLER)
        .json(&json!({"message": "   "}))
        .send(app)
        .await;

    assert_eq!(response.status(), 400);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error.as_str(), "INVALID_INPUT");
    assert!(body.request_id.is_some());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_attachment_rejected() {
    let (app, model) = router_with(ScriptedModelClient::new(vec![]), RecordingGateway::new()).await;

    let response = AxumTestRequest::post("/api/chat")
        .api_key(CALLER)
        .json(&json!({
            "message": "see attached",
            "attachments": [{"file_name": "report.csv", "content_type": "text/csv", "base64": "%%%not-base64%%%"}]
        }))
        .send(app)
        .await;

    assert_eq!(response.status(), 400);
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let (app, _) = mock_router().await;

    let response = AxumTestRequest::post("/api/chat")
        .api_key(CALLER)
        .raw_json("{\"msg\": 1")
        .send(app)
        .await;

    assert_eq!(response.status(), 400);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error.as_str(), "INVALID_INPUT");
}

#[tokio::test]
async fn test_missing_caller_key_rejected() {
    let (app, _) = mock_router().await;

    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({"message": "hi"}))
        .send(app)
        .await;

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_model_outage_maps_to_bad_gateway() {
    let (app, _) = router_with(ScriptedModelClient::new(vec![]), RecordingGateway::new()).await;

    let response = AxumTestRequest::post("/api/chat")
        .header("authorization", &format!("Bearer {CALLER}"))
        .header("x-request-id", "req-outage")
        .json(&json!({"message": "hi"}))
        .send(app)
        .await;

    assert_eq!(response.status(), 502);
    assert_eq!(response.header("x-request-id").as_deref(), Some("req-outage"));
    let body: ErrorResponse = response.json();
    assert_eq!(body.error.as_str(), "UPSTREAM_UNAVAILABLE");
    assert_eq!(body.request_id.as_deref(), Some("req-outage"));
}

#[tokio::test]
async fn test_model_failure_detail_not_exposed() {
    let (app, _) = router_with(
        ScriptedModelClient::new(vec![Err(ModelError::Transport(
            "cannot connect to model endpoint at http://127.0.0.1:1/internal-llm/v1: connection refused"
                .to_owned(),
        ))]),
        RecordingGateway::new(),
    )
    .await;

    let response = AxumTestRequest::post("/api/chat")
        .api_key(CALLER)
        .json(&json!({"message": "hi"}))
        .send(app)
        .await;

    assert_eq!(response.status(), 502);
    let body = response.text();
    assert!(!body.contains("internal-llm"));
    assert!(!body.contains("connection refused"));
    let body: ErrorResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(body.message.as_deref(), Some("model endpoint unavailable"));
}

#[tokio::test]
async fn test_cors_headers_survive_full_layer_stack() {
    let (app, _) = mock_router().await;

    let response = AxumTestRequest::get("/health")
        .header("origin", "https://app.example.com")
        .send(app)
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.header("access-control-allow-origin").as_deref(),
        Some("*")
    );
    assert!(response.header("x-request-id").is_some());
}

// ============================================================================
// Streaming Turns
// ============================================================================

#[tokio::test]
async fn test_stream_emits_tokens_then_final() {
    let (app, _) = router_with(
        ScriptedModelClient::new(vec![final_turn("Campaign X is performing well.")]),
        RecordingGateway::new(),
    )
    .await;

    let response = AxumTestRequest::post("/api/chat/stream")
        .api_key(CALLER)
        .json(&json!({"message": "how is X?"}))
        .send(app)
        .await;

    assert_eq!(response.status(), 200);
    assert!(response
        .header("content-type")
        .unwrap()
        .starts_with("text/event-stream"));

    let frames = response.sse_frames();
    let (last, tokens) = frames.split_last().unwrap();
    assert!(!tokens.is_empty());
    assert!(tokens.iter().all(|frame| frame.event == "token"));
    assert_eq!(last.event, "final");

    let text: String = tokens
        .iter()
        .map(|frame| {
            let payload: Value = serde_json::from_str(&frame.data).unwrap();
            payload["text"].as_str().unwrap().to_owned()
        })
        .collect();
    let final_response: ChatResponse = serde_json::from_str(&last.data).unwrap();
    assert_eq!(text, final_response.answer);
    assert_eq!(final_response.answer, "Campaign X is performing well.");
}

#[tokio::test]
async fn test_stream_error_is_single_terminal_event() {
    let (app, _) = router_with(ScriptedModelClient::new(vec![]), RecordingGateway::new()).await;

    let response = AxumTestRequest::post("/api/chat/stream")
        .api_key(CALLER)
        .json(&json!({"message": "hi"}))
        .send(app)
        .await;

    assert_eq!(response.status(), 200);
    let frames = response.sse_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].event, "error");
    let error: ErrorResponse = serde_json::from_str(&frames[0].data).unwrap();
    assert_eq!(error.error.as_str(), "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn test_stream_validation_fails_before_stream_opens() {
    let (app, _) = mock_router().await;

    let response = AxumTestRequest::post("/api/chat/stream")
        .api_key(CALLER)
        .json(&json!({"message": ""}))
        .send(app)
        .await;

    assert_eq!(response.status(), 400);
}

// ============================================================================
// Conversations
// ============================================================================

#[tokio::test]
async fn test_conversation_lifecycle() {
    let (app, store) = mock_router().await;

    let created = AxumTestRequest::post("/api/chat/conversations")
        .api_key(CALLER)
        .send(app.clone())
        .await;
    assert_eq!(created.status(), 201);
    let conversation: Conversation = created.json();

    store
        .append_messages(
            CALLER,
            &conversation.id,
            &[
                (MessageRole::User, "first"),
                (MessageRole::Assistant, "second"),
                (MessageRole::User, "third"),
            ],
        )
        .await
        .unwrap();

    let fetched = AxumTestRequest::get(&format!("/api/chat/conversations/{}", conversation.id))
        .api_key(CALLER)
        .send(app.clone())
        .await;
    assert_eq!(fetched.status(), 200);
    let fetched: Value = fetched.json();
    assert_eq!(fetched["id"], conversation.id.as_str());
    assert!(fetched.get("owner_key").is_none());

    let messages = AxumTestRequest::get(&format!(
        "/api/chat/conversations/{}/messages?limit=2",
        conversation.id
    ))
    .api_key(CALLER)
    .send(app.clone())
    .await;
    assert_eq!(messages.status(), 200);
    let messages: MessagesListResponse = messages.json();
    let contents: Vec<&str> = messages.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["second", "third"]);

    let foreign = AxumTestRequest::get(&format!("/api/chat/conversations/{}", conversation.id))
        .api_key("someone-else-9999")
        .send(app.clone())
        .await;
    assert_eq!(foreign.status(), 404);

    let foreign_messages = AxumTestRequest::get(&format!(
        "/api/chat/conversations/{}/messages",
        conversation.id
    ))
    .api_key("someone-else-9999")
    .send(app)
    .await;
    assert_eq!(foreign_messages.status(), 404);
}

#[tokio::test]
async fn test_conversation_lookup_failure_carries_request_id() {
    let store: Arc<dyn ChatStore> =
        Arc::new(FaultyStore::new(common::create_test_store().await).failing_lookups());
    let engine: Arc<dyn ChatEngine> = Arc::new(MockEngine::new("unused"));
    let app = build_router(&Arc::new(ServerResources::new(
        ServerConfig::default(),
        store,
        engine,
    )));

    for uri in [
        "/api/chat/conversations/conv-1",
        "/api/chat/conversations/conv-1/messages",
    ] {
        let response = AxumTestRequest::get(uri)
            .api_key(CALLER)
            .header("x-request-id", "req-lookup")
            .send(app.clone())
            .await;

        assert_eq!(response.status(), 500);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error.as_str(), "DATABASE_ERROR");
        assert_eq!(body.request_id.as_deref(), Some("req-lookup"));
    }
}

#[tokio::test]
async fn test_missing_conversation_not_found() {
    let (app, _) = mock_router().await;

    let response = AxumTestRequest::get("/api/chat/conversations/does-not-exist")
        .api_key(CALLER)
        .send(app)
        .await;
    assert_eq!(response.status(), 404);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_and_ready() {
    let (app, _) = mock_router().await;

    let health = AxumTestRequest::get("/health").send(app.clone()).await;
    assert_eq!(health.status(), 200);
    let health: Value = health.json();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["engine"], "mock");

    let ready = AxumTestRequest::get("/ready").send(app).await;
    assert_eq!(ready.status(), 200);
}

// ABOUTME: Integration tests for the OpenAI-compatible model client against a mock endpoint
// ABOUTME: Covers blocking and streamed completions, tool calls, and error classification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::time::Duration;

use adchat_server::errors::ModelError;
use adchat_server::llm::{
    ChatMessage, ModelClient, ModelEvent, ModelTurn, OpenAiCompatibleClient,
    OpenAiCompatibleConfig,
};
use adchat_server::tools::ToolCatalog;
use serde_json::json;
use tokio_stream::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout: Duration) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::new(OpenAiCompatibleConfig {
        base_url: format!("{}/v1", server.uri()),
        api_key: Some("sk-test".to_owned()),
        model: "gpt-test".to_owned(),
        temperature: Some(0.2),
        timeout,
    })
    .unwrap()
}

fn messages() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a campaign analyst."),
        ChatMessage::user("How many impressions did campaign X get?"),
    ]
}

#[tokio::test]
async fn test_blocking_final_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-test", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Campaign X had 1500 impressions."},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let turn = client.complete(&messages(), &[]).await.unwrap();

    assert_eq!(
        turn,
        ModelTurn::Final {
            content: "Campaign X had 1500 impressions.".to_owned(),
            finish_reason: Some("stop".to_owned()),
        }
    );
}

#[tokio::test]
async fn test_blocking_tool_calls_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"tool_choice": "auto"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "get_impressions", "arguments": "{\"campaign_id\":\"X\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let catalog = ToolCatalog::default();
    let turn = client.complete(&messages(), catalog.declarations()).await.unwrap();

    match turn {
        ModelTurn::ToolCalls { content, calls } => {
            assert!(content.is_none());
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id, "call_abc");
            assert_eq!(calls[0].name, "get_impressions");
            assert_eq!(calls[0].arguments, json!({"campaign_id": "X"}));
        }
        other => panic!("expected tool calls, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_status_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "rate_limit"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let error = client.complete(&messages(), &[]).await.unwrap_err();

    assert_eq!(
        error,
        ModelError::Status {
            status: 429,
            message: "Rate limit reached".to_owned(),
        }
    );
    assert_eq!(error.step_status(), 429);
}

#[tokio::test]
async fn test_malformed_body_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let error = client.complete(&messages(), &[]).await.unwrap_err();
    assert!(matches!(error, ModelError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_millis(200));
    let error = client.complete(&messages(), &[]).await.unwrap_err();
    assert!(matches!(error, ModelError::Timeout { .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let client = OpenAiCompatibleClient::new(OpenAiCompatibleConfig {
        base_url: "http://127.0.0.1:9/v1".to_owned(),
        api_key: None,
        model: "gpt-test".to_owned(),
        temperature: None,
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    let error = client.complete(&messages(), &[]).await.unwrap_err();
    assert!(matches!(error, ModelError::Transport(_)));
}

#[tokio::test]
async fn test_streamed_tokens_then_completed() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"Campaign X \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"had 1500 \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"impressions.\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let events: Vec<ModelEvent> = client
        .complete_stream(&messages(), &[])
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    let tokens: String = events
        .iter()
        .filter_map(|event| match event {
            ModelEvent::Token(text) => Some(text.as_str()),
            ModelEvent::Completed(_) => None,
        })
        .collect();
    assert_eq!(tokens, "Campaign X had 1500 impressions.");
    assert_eq!(
        events.last(),
        Some(&ModelEvent::Completed(ModelTurn::Final {
            content: "Campaign X had 1500 impressions.".to_owned(),
            finish_reason: Some("stop".to_owned()),
        }))
    );
}

#[tokio::test]
async fn test_streamed_tool_call_deltas_accumulated() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"get_campaign\",\"arguments\":\"\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"campaign_id\\\":\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"\\\"X\\\"}\"}}]},\"finish_reason\":\"tool_calls\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let mut stream = client.complete_stream(&messages(), &[]).await.unwrap();

    let mut completed = None;
    while let Some(event) = stream.next().await {
        match event.unwrap() {
            ModelEvent::Token(text) => panic!("unexpected token {text}"),
            ModelEvent::Completed(turn) => completed = Some(turn),
        }
    }

    match completed.unwrap() {
        ModelTurn::ToolCalls { calls, .. } => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id, "call_1");
            assert_eq!(calls[0].name, "get_campaign");
            assert_eq!(calls[0].arguments, json!({"campaign_id": "X"}));
        }
        other => panic!("expected tool calls, got {other:?}"),
    }
}

#[tokio::test]
async fn test_truncated_stream_is_malformed() {
    let server = MockServer::start().await;
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let results: Vec<_> = client
        .complete_stream(&messages(), &[])
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0], Ok(ModelEvent::Token("partial".to_owned())));
    assert!(matches!(results[1], Err(ModelError::MalformedResponse(_))));
}

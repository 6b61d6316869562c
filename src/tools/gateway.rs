// ABOUTME: Tool gateway client executing one resolved tool call per invocation
// ABOUTME: HTTP implementation posts JSON arguments and returns status plus raw body bytes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tool Gateway Client
//!
//! The gateway owns the business logic behind each tool. This client only
//! moves bytes: one `POST {base}/tools/{name}` per call, no retries, no
//! caching. Any HTTP status is a valid outcome and is handed back to the
//! engine unchanged; only transport failures and timeouts are errors.

use std::time::{Duration, Instant};

use adchat_core::errors::GatewayError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument};

use super::catalog::GatewayTool;

/// Connection establishment deadline
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Outcome of one gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    /// HTTP status returned by the gateway
    pub status: u16,
    /// Raw response body
    pub body: Bytes,
}

impl GatewayResponse {
    /// Whether the gateway answered with a 2xx status
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Executes resolved tool calls
#[async_trait]
pub trait ToolGatewayClient: Send + Sync {
    /// Execute one tool call
    ///
    /// # Errors
    ///
    /// Returns `Transport` or `Timeout` when no response was received.
    async fn invoke(&self, tool: &GatewayTool) -> Result<GatewayResponse, GatewayError>;
}

/// Configuration for [`HttpToolGateway`]
#[derive(Debug, Clone)]
pub struct HttpToolGatewayConfig {
    /// Gateway base URL
    pub base_url: String,
    /// Optional bearer token
    pub token: Option<String>,
    /// Per-call deadline
    pub timeout: Duration,
}

/// HTTP tool gateway client
pub struct HttpToolGateway {
    client: Client,
    config: HttpToolGatewayConfig,
}

impl HttpToolGateway {
    /// Create a new gateway client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: HttpToolGatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn tool_url(&self, tool_name: &str) -> String {
        format!(
            "{}/tools/{tool_name}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn map_error(&self, error: &reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout {
                after_secs: self.config.timeout.as_secs(),
            }
        } else {
            GatewayError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl ToolGatewayClient for HttpToolGateway {
    #[instrument(skip_all, fields(tool = tool.name()))]
    async fn invoke(&self, tool: &GatewayTool) -> Result<GatewayResponse, GatewayError> {
        let start = Instant::now();

        let mut request = self
            .client
            .post(self.tool_url(tool.name()))
            .json(&tool.arguments());
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_error(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_error(&e))?;

        debug!(
            status,
            body_len = body.len(),
            duration_ms = start.elapsed().as_millis(),
            "Tool gateway call completed"
        );

        Ok(GatewayResponse { status, body })
    }
}

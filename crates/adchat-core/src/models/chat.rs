// ABOUTME: Chat turn request and response types exchanged with callers
// ABOUTME: Includes attachment validation, the structured impressions payload, and the step trace
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::limits;
use crate::errors::{AppError, AppResult};

// ============================================================================
// Request
// ============================================================================

/// File supplied alongside a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name
    pub file_name: String,
    /// MIME type declared by the client
    pub content_type: String,
    /// Base64-encoded file bytes
    #[serde(rename = "base64")]
    pub content_base64: String,
}

impl Attachment {
    /// Decode the attachment bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the payload is not valid base64 or exceeds the size limit.
    pub fn decode(&self) -> AppResult<Vec<u8>> {
        let bytes = STANDARD.decode(self.content_base64.trim()).map_err(|e| {
            AppError::invalid_input(format!(
                "attachment '{}' is not valid base64: {e}",
                self.file_name
            ))
        })?;
        if bytes.len() > limits::MAX_ATTACHMENT_BYTES {
            return Err(AppError::invalid_input(format!(
                "attachment '{}' exceeds {} bytes",
                self.file_name,
                limits::MAX_ATTACHMENT_BYTES
            )));
        }
        Ok(bytes)
    }

    /// Whether the content type can be inlined as text for the model
    #[must_use]
    pub fn is_text_like(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        content_type.starts_with("text/")
            || matches!(
                content_type.split(';').next().map(str::trim),
                Some("application/json" | "application/csv" | "application/xml")
            )
    }
}

/// Inbound turn request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User message text
    pub message: String,
    /// Conversation to continue; absent or empty means a stateless turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Ordered attachments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ChatRequest {
    /// Create a request with a message and nothing else
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
            attachments: Vec::new(),
        }
    }

    /// Continue an existing conversation
    #[must_use]
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Append an attachment
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Conversation id when one was supplied and is non-empty
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Validate the request before it reaches the engine
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty or oversized message, too many attachments,
    /// or an attachment that fails to decode.
    pub fn validate(&self) -> AppResult<()> {
        if self.message.trim().is_empty() {
            return Err(AppError::invalid_input("message must not be empty"));
        }
        if self.message.chars().count() > limits::MAX_MESSAGE_CHARS {
            return Err(AppError::invalid_input(format!(
                "message exceeds {} characters",
                limits::MAX_MESSAGE_CHARS
            )));
        }
        if self.attachments.len() > limits::MAX_ATTACHMENTS {
            return Err(AppError::invalid_input(format!(
                "at most {} attachments are allowed",
                limits::MAX_ATTACHMENTS
            )));
        }
        for attachment in &self.attachments {
            if attachment.file_name.trim().is_empty() {
                return Err(AppError::invalid_input("attachment file_name is required"));
            }
            attachment.decode()?;
        }
        Ok(())
    }
}

// ============================================================================
// Response
// ============================================================================

/// Per-poster impression breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosterImpression {
    /// Poster identifier
    pub poster_id: String,
    /// Poster display name
    pub poster_name: String,
    /// Impressions attributed to the poster
    pub impressions: u64,
    /// Play time in seconds, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_time: Option<f64>,
}

/// Impression totals for one campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignImpressions {
    /// Campaign identifier
    pub campaign_id: String,
    /// Total impressions
    pub impressions: u64,
    /// Per-poster breakdown
    #[serde(default)]
    pub posters: Vec<PosterImpression>,
}

/// Structured payload extracted from tool results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatData {
    /// Impression analytics, when a tool returned them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_impressions: Option<CampaignImpressions>,
}

/// Record of one tool invocation (or synthetic loop event) within a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Tool name, or a synthetic step name
    pub tool: String,
    /// Campaign the call targeted, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    /// HTTP-style status of the outcome
    pub status: u16,
    /// Failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Response body; unparseable bodies are kept verbatim as a JSON string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Step {
    /// Whether the step completed with a 2xx status
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Final result of one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Natural-language answer
    pub answer: String,
    /// Structured payload; absent when no tool produced recognizable data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ChatData>,
    /// Execution trace in invocation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

// ABOUTME: Conversation and message record types for per-caller chat persistence
// ABOUTME: Messages are append-only and ordered by a monotonically increasing id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
    /// Tool result message
    Tool,
}

impl MessageRole {
    /// Convert to string representation for storage and API calls
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(AppError::internal(format!("unknown message role '{other}'"))),
        }
    }
}

/// A conversation owned by exactly one caller key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Opaque conversation id
    pub id: String,
    /// Caller key that owns the conversation
    #[serde(skip_serializing, default)]
    pub owner_key: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time of the last appended message
    pub updated_at: DateTime<Utc>,
}

/// An immutable message within a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Ordering key, increasing with insertion
    pub id: i64,
    /// Owning conversation
    pub conversation_id: String,
    /// Sender role
    pub role: MessageRole,
    /// Text content
    pub content: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

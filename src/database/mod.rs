// ABOUTME: Conversation persistence interface scoped by caller key
// ABOUTME: Defines the ChatStore trait and exposes the SQLite implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Conversation Store
//!
//! Every operation takes the caller key that owns the conversation. A caller
//! can never read or extend a conversation owned by another key; such lookups
//! behave exactly like a missing conversation.
//!
//! Messages are append-only. Their integer id increases with insertion and is
//! the only ordering key.

mod chat;

pub use chat::SqliteChatStore;

use adchat_core::errors::{AppError, AppResult};
use adchat_core::models::{Conversation, Message, MessageRole};
use async_trait::async_trait;

/// Persistence for conversations and their messages
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create a new conversation owned by `owner_key`
    ///
    /// # Errors
    ///
    /// Returns a database error if the insert fails.
    async fn create_conversation(&self, owner_key: &str) -> AppResult<Conversation>;

    /// Fetch a conversation; `None` when missing or owned by another key
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    async fn get_conversation(
        &self,
        owner_key: &str,
        conversation_id: &str,
    ) -> AppResult<Option<Conversation>>;

    /// Append messages in order, creating the conversation if it does not exist
    ///
    /// All messages are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the conversation belongs to another key,
    /// or a database error if the write fails.
    async fn append_messages(
        &self,
        owner_key: &str,
        conversation_id: &str,
        messages: &[(MessageRole, &str)],
    ) -> AppResult<Vec<Message>>;

    /// Append one message, creating the conversation if it does not exist
    ///
    /// # Errors
    ///
    /// Same as [`ChatStore::append_messages`].
    async fn append_message(
        &self,
        owner_key: &str,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AppResult<Message> {
        let mut written = self
            .append_messages(owner_key, conversation_id, &[(role, content)])
            .await?;
        written
            .pop()
            .ok_or_else(|| AppError::database("Message insert returned no row"))
    }

    /// List the newest `limit` messages, returned oldest-first
    ///
    /// `limit` is clamped to `1..=MAX_HISTORY_LIMIT`. A conversation that does
    /// not exist yet yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the conversation belongs to another key,
    /// or a database error if the query fails.
    async fn list_messages(
        &self,
        owner_key: &str,
        conversation_id: &str,
        limit: u32,
    ) -> AppResult<Vec<Message>>;

    /// Check that the store is reachable
    ///
    /// # Errors
    ///
    /// Returns a database error if the store cannot be queried.
    async fn ping(&self) -> AppResult<()>;
}

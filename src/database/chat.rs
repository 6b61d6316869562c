// ABOUTME: SQLite implementation of the conversation store using sqlx
// ABOUTME: Handles schema migration, owner isolation, and race-tolerant conversation creation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fs;
use std::path::Path;
use std::str::FromStr;

use adchat_core::constants::limits;
use adchat_core::errors::{AppError, AppResult};
use adchat_core::models::{Conversation, Message, MessageRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::ChatStore;

/// Connections for file-backed databases
const FILE_POOL_SIZE: u32 = 5;

// ============================================================================
// SQLite Store
// ============================================================================

/// Conversation store backed by `SQLite`
#[derive(Clone)]
pub struct SqliteChatStore {
    pool: SqlitePool,
}

impl SqliteChatStore {
    /// Connect to `database_url` and run migrations
    ///
    /// The parent directory of a file database is created when missing.
    /// In-memory databases use a single connection so every query sees the same data.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection fails, or migrations fail.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid DATABASE_URL '{database_url}': {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        if !in_memory {
            ensure_parent_dir(options.get_filename())?;
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(FILE_POOL_SIZE)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;

        info!(in_memory, "Conversation store ready");
        Ok(store)
    }

    /// Open a private in-memory store
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migrations fail.
    pub async fn in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Create tables and indexes if they do not exist
    ///
    /// # Errors
    ///
    /// Returns an error if a schema statement fails.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chat_conversations (
                id TEXT PRIMARY KEY,
                owner_key TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create chat_conversations: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL REFERENCES chat_conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL CHECK (role IN ('system', 'user', 'assistant', 'tool')),
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create chat_messages: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_conversation ON chat_messages(conversation_id, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create message index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_conversations_owner ON chat_conversations(owner_key)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation index: {e}")))?;

        Ok(())
    }

    /// Owner of a conversation, `None` when it does not exist
    async fn conversation_owner(
        tx: &mut Transaction<'_, Sqlite>,
        conversation_id: &str,
    ) -> AppResult<Option<String>> {
        let row = sqlx::query("SELECT owner_key FROM chat_conversations WHERE id = $1")
            .bind(conversation_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up conversation: {e}")))?;
        Ok(row.map(|r| r.get("owner_key")))
    }
}

fn ensure_parent_dir(path: &Path) -> AppResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::config(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })
        }
        _ => Ok(()),
    }
}

fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("Invalid stored timestamp '{raw}': {e}")))
}

fn conversation_from_row(row: &SqliteRow) -> AppResult<Conversation> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    Ok(Conversation {
        id: row.get("id"),
        owner_key: row.get("owner_key"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn message_from_row(row: &SqliteRow) -> AppResult<Message> {
    let role: String = row.get("role");
    let created_at: String = row.get("created_at");
    Ok(Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        role: role.parse()?,
        content: row.get("content"),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn not_found() -> AppError {
    AppError::not_found("Conversation")
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn create_conversation(&self, owner_key: &str) -> AppResult<Conversation> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let stamp = now.to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO chat_conversations (id, owner_key, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ",
        )
        .bind(&id)
        .bind(owner_key)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        debug!(conversation_id = %id, "Created conversation");

        Ok(Conversation {
            id,
            owner_key: owner_key.to_owned(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_conversation(
        &self,
        owner_key: &str,
        conversation_id: &str,
    ) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(
            r"
            SELECT id, owner_key, created_at, updated_at
            FROM chat_conversations
            WHERE id = $1 AND owner_key = $2
            ",
        )
        .bind(conversation_id)
        .bind(owner_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn append_messages(
        &self,
        owner_key: &str,
        conversation_id: &str,
        messages: &[(MessageRole, &str)],
    ) -> AppResult<Vec<Message>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let now = Utc::now();
        let stamp = now.to_rfc3339();

        // Concurrent first writes to the same id both succeed; only one row is created
        sqlx::query(
            r"
            INSERT INTO chat_conversations (id, owner_key, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(conversation_id)
        .bind(owner_key)
        .bind(&stamp)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        match Self::conversation_owner(&mut tx, conversation_id).await? {
            Some(owner) if owner == owner_key => {}
            _ => return Err(not_found()),
        }

        let mut written = Vec::with_capacity(messages.len());
        for (role, content) in messages {
            let result = sqlx::query(
                r"
                INSERT INTO chat_messages (conversation_id, role, content, created_at)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(conversation_id)
            .bind(role.as_str())
            .bind(*content)
            .bind(&stamp)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to append message: {e}")))?;

            written.push(Message {
                id: result.last_insert_rowid(),
                conversation_id: conversation_id.to_owned(),
                role: *role,
                content: (*content).to_owned(),
                created_at: now,
            });
        }

        sqlx::query("UPDATE chat_conversations SET updated_at = $1 WHERE id = $2")
            .bind(&stamp)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to update conversation: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit messages: {e}")))?;

        debug!(
            conversation_id,
            count = written.len(),
            "Appended conversation messages"
        );
        Ok(written)
    }

    async fn list_messages(
        &self,
        owner_key: &str,
        conversation_id: &str,
        limit: u32,
    ) -> AppResult<Vec<Message>> {
        let limit = limit.clamp(1, limits::MAX_HISTORY_LIMIT);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        match Self::conversation_owner(&mut tx, conversation_id).await? {
            None => return Ok(Vec::new()),
            Some(owner) if owner != owner_key => return Err(not_found()),
            Some(_) => {}
        }

        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, role, content, created_at FROM (
                SELECT m.id, m.conversation_id, m.role, m.content, m.created_at
                FROM chat_messages m
                JOIN chat_conversations c ON c.id = m.conversation_id
                WHERE m.conversation_id = $1 AND c.owner_key = $2
                ORDER BY m.id DESC
                LIMIT $3
            )
            ORDER BY id ASC
            ",
        )
        .bind(conversation_id)
        .bind(owner_key)
        .bind(i64::from(limit))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to list messages: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to finish read: {e}")))?;

        rows.iter().map(message_from_row).collect()
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database ping failed: {e}")))?;
        Ok(())
    }
}

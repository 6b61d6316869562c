// ABOUTME: Main library entry point for the campaign analytics chat server
// ABOUTME: Exposes the orchestration engine, collaborators, persistence, and HTTP surface
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Adchat Server
//!
//! Answers natural-language questions about advertising campaigns. Each turn
//! runs a bounded loop in which a language model may request tool calls
//! against the campaign tool gateway; results are fed back until the model
//! produces a final answer.
//!
//! ## Architecture
//!
//! - **services**: the orchestration engine, mock engine, and response assembler
//! - **llm**: message types, the `ModelClient` seam, and the OpenAI-compatible client
//! - **tools**: the static tool catalog and the gateway client
//! - **database**: per-caller conversation persistence on `SQLite`
//! - **routes**: blocking and SSE chat endpoints plus conversation and health routes
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use adchat_server::config::ServerConfig;
//! use adchat_server::server::{serve, ServerResources};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let port = config.http_port;
//!     let resources = Arc::new(ServerResources::from_config(config).await?);
//!     serve(resources, port).await
//! }
//! ```

/// Environment-based configuration
pub mod config;

/// Conversation persistence
pub mod database;

/// Model endpoint client and message types
pub mod llm;

/// Structured logging setup
pub mod logging;

/// Caller identification, request context, and CORS
pub mod middleware;

/// HTTP route handlers
pub mod routes;

/// Shared resources, router assembly, and the serve loop
pub mod server;

/// Orchestration and mock engines
pub mod services;

/// Tool catalog and gateway client
pub mod tools;

/// Re-exported error types
pub use adchat_core::errors;

/// Re-exported data model
pub use adchat_core::models;

/// Re-exported constants
pub use adchat_core::constants;

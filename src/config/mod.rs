// ABOUTME: Configuration module for centralized server settings
// ABOUTME: Loads model, tool gateway, engine, storage, and HTTP settings from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module for the chat server
//!
//! All settings come from environment variables with documented defaults.
//! Invalid values fail startup instead of being silently replaced.

/// Environment and server configuration
pub mod environment;

pub use environment::{EngineConfig, GatewayConfig, LlmConfig, ServerConfig};

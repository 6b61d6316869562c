// ABOUTME: Route module organization for the campaign chat HTTP endpoints
// ABOUTME: Groups chat turn, conversation, and health routes by domain
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for the chat server
//!
//! Each domain module contains only route definitions and thin handlers that
//! delegate to the engine or the conversation store.

/// Chat turn and conversation routes
pub mod chat;
/// Health check and readiness routes
pub mod health;

/// Chat route handlers
pub use chat::ChatRoutes;
/// Health route handlers
pub use health::HealthRoutes;

// ABOUTME: HTTP middleware for request context, caller identification, and CORS
// ABOUTME: Provides request ID propagation, cancellation tokens, and redacted caller labels for logging
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod auth;
pub mod cors;
pub mod redaction;
pub mod tracing;

// Caller key extraction
pub use auth::extract_caller_key;

// CORS configuration
pub use cors::setup_cors;

// Log-safe caller labels
pub use redaction::redact_caller_key;

// Request context and spans
pub use tracing::{create_turn_span, RequestContext};

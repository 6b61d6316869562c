// ABOUTME: Error kinds for the model endpoint and tool gateway collaborators
// ABOUTME: Each kind maps to a step status so failures can be recorded without aborting a turn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Upstream Error Types
//!
//! - `ModelError` - transport, timeout, non-success status, or malformed body from the model endpoint
//! - `GatewayError` - tool resolution and transport failures against the tool gateway
//!
//! Non-2xx gateway responses are not errors: the gateway returns them as a status
//! and body, and the engine records them on the step as-is.

use thiserror::Error;

use super::{AppError, ErrorCode};

/// Errors returned by a model client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Connection or I/O failure before a response was received
    #[error("model transport error: {0}")]
    Transport(String),
    /// The call exceeded its deadline
    #[error("model call timed out after {after_secs}s")]
    Timeout {
        /// Configured deadline in seconds
        after_secs: u64,
    },
    /// The endpoint answered with a non-success status
    #[error("model endpoint returned {status}: {message}")]
    Status {
        /// HTTP status returned by the endpoint
        status: u16,
        /// Error detail extracted from the body
        message: String,
    },
    /// The response body could not be interpreted
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

impl ModelError {
    /// HTTP-style status to record on a step for this failure
    #[must_use]
    pub const fn step_status(&self) -> u16 {
        match self {
            Self::Timeout { .. } => 504,
            Self::Status { status, .. } if *status >= 400 => *status,
            Self::Transport(_) | Self::Status { .. } | Self::MalformedResponse(_) => 502,
        }
    }
}

impl ModelError {
    /// Caller-facing description; endpoint URLs and provider detail stay in logs
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "model endpoint did not respond in time",
            Self::Status { .. } => "model endpoint rejected the request",
            Self::Transport(_) | Self::MalformedResponse(_) => "model endpoint unavailable",
        }
    }
}

impl From<ModelError> for AppError {
    fn from(error: ModelError) -> Self {
        Self::new(ErrorCode::UpstreamUnavailable, error.public_message())
    }
}

/// Errors returned while resolving or invoking a gateway tool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Tool name is not part of the enabled tool schema
    #[error("unknown tool '{name}'")]
    UnknownTool {
        /// Name requested by the model
        name: String,
    },
    /// Arguments do not match the tool's schema
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments {
        /// Tool name
        tool: String,
        /// Validation failure detail
        reason: String,
    },
    /// Connection or I/O failure talking to the gateway
    #[error("tool gateway transport error: {0}")]
    Transport(String),
    /// The call exceeded its deadline
    #[error("tool call timed out after {after_secs}s")]
    Timeout {
        /// Configured deadline in seconds
        after_secs: u64,
    },
}

impl GatewayError {
    /// Create an "invalid arguments" error
    #[must_use]
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// HTTP-style status to record on a step for this failure
    #[must_use]
    pub const fn step_status(&self) -> u16 {
        match self {
            Self::UnknownTool { .. } | Self::InvalidArguments { .. } => 400,
            Self::Transport(_) => 502,
            Self::Timeout { .. } => 504,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::UnknownTool { .. } | GatewayError::InvalidArguments { .. } => {
                Self::invalid_input(error.to_string())
            }
            GatewayError::Transport(_) => Self::upstream_unavailable("tool gateway unavailable"),
            GatewayError::Timeout { .. } => {
                Self::upstream_unavailable("tool gateway did not respond in time")
            }
        }
    }
}

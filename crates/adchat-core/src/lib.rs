// ABOUTME: Core types and constants for the campaign analytics chat service
// ABOUTME: Foundation crate with error handling, the chat data model, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Adchat Core
//!
//! Foundation crate providing shared types and constants for the campaign
//! analytics chat service. This crate is designed to change infrequently,
//! enabling incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and upstream error kinds
//! - **models**: Turn request/response shapes, steps, and conversation records
//! - **constants**: Limits, defaults, environment variable names, and tool identifiers

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Chat turn and conversation data model
pub mod models;

/// Application constants organized by domain
pub mod constants;

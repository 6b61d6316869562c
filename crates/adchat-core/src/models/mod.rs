// ABOUTME: Data model for chat turns and persisted conversations
// ABOUTME: Re-exports request/response shapes, execution steps, and conversation records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Turn request, response, structured payload, and step trace
pub mod chat;
/// Conversation and message records
pub mod conversation;

pub use chat::{
    Attachment, CampaignImpressions, ChatData, ChatRequest, ChatResponse, PosterImpression, Step,
};
pub use conversation::{Conversation, Message, MessageRole};

// ABOUTME: Renders request attachments into the user message shown to the model
// ABOUTME: Inlines text-like files with truncation and describes binary files by name, type, and size
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::Write;

use adchat_core::constants::limits;
use adchat_core::errors::AppResult;
use adchat_core::models::{Attachment, ChatRequest};

use super::truncate_chars;

/// Build the user message content, appending every attachment in order
///
/// # Errors
///
/// Returns `InvalidInput` if an attachment fails to decode.
pub fn render_user_message(request: &ChatRequest) -> AppResult<String> {
    let mut content = request.message.clone();
    for attachment in &request.attachments {
        content.push_str("\n\n");
        content.push_str(&render_attachment(attachment)?);
    }
    Ok(content)
}

fn render_attachment(attachment: &Attachment) -> AppResult<String> {
    let bytes = attachment.decode()?;
    let mut rendered = format!(
        "[Attachment: {} ({}, {} bytes)]",
        attachment.file_name,
        attachment.content_type,
        bytes.len()
    );

    if attachment.is_text_like() {
        let text = String::from_utf8_lossy(&bytes);
        let (inline, truncated) = truncate_chars(&text, limits::MAX_ATTACHMENT_INLINE_CHARS);
        rendered.push('\n');
        rendered.push_str(&inline);
        if truncated {
            let _ = write!(
                rendered,
                "\n[Truncated after {} characters]",
                limits::MAX_ATTACHMENT_INLINE_CHARS
            );
        }
        rendered.push_str("\n[End of attachment]");
    } else {
        rendered.push_str(" Binary content is not shown.");
    }
    Ok(rendered)
}

// ABOUTME: Caller key extraction from request headers
// ABOUTME: Accepts x-api-key or an Authorization bearer token; key validation happens upstream
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use adchat_core::constants::headers as header_names;
use adchat_core::errors::{AppError, AppResult};
use http::header::AUTHORIZATION;
use http::HeaderMap;

/// Bearer scheme prefix in the Authorization header
const BEARER_PREFIX: &str = "Bearer ";

/// Extract the caller key that scopes conversations
///
/// `x-api-key` wins over `Authorization: Bearer <key>` when both are present.
///
/// # Errors
///
/// Returns `AuthRequired` when neither header carries a non-empty key.
pub fn extract_caller_key(headers: &HeaderMap) -> AppResult<String> {
    let from_api_key = headers
        .get(header_names::API_KEY)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty());

    let from_bearer = || {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|key| !key.is_empty())
    };

    from_api_key
        .or_else(from_bearer)
        .map(ToOwned::to_owned)
        .ok_or_else(AppError::auth_required)
}

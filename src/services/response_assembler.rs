// ABOUTME: Converts the step trace into the structured payload and the final answer text
// ABOUTME: Recognizes campaign impression bodies and synthesizes a best-effort answer when needed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Response Assembler
//!
//! Pure functions over the model's closing message and the step trace.
//! Nothing here performs I/O or fails: bodies that do not match a known shape
//! are simply not extracted, and they stay untouched on their step.

use adchat_core::constants::steps as step_names;
use adchat_core::models::{CampaignImpressions, ChatData, ChatResponse, PosterImpression, Step};
use serde_json::{Map, Value};

/// Builds the final [`ChatResponse`] for a turn
pub struct ResponseAssembler;

impl ResponseAssembler {
    /// Assemble the response from the closing message and the step trace
    ///
    /// A missing or blank closing message is replaced by an answer
    /// synthesized from the steps.
    #[must_use]
    pub fn assemble(final_message: Option<&str>, steps: Vec<Step>) -> ChatResponse {
        let impressions = Self::extract_impressions(&steps);

        let answer = match final_message {
            Some(message) if !message.trim().is_empty() => message.to_owned(),
            _ => Self::fallback_answer(&steps, impressions.as_ref()),
        };

        ChatResponse {
            answer,
            data: impressions.map(|campaign_impressions| ChatData {
                campaign_impressions: Some(campaign_impressions),
            }),
            steps,
        }
    }

    /// Impressions from the latest successful step with a recognized body
    #[must_use]
    pub fn extract_impressions(steps: &[Step]) -> Option<CampaignImpressions> {
        steps.iter().rev().filter(|step| step.is_success()).find_map(|step| {
            step.body
                .as_ref()
                .and_then(|body| recognize_impressions(body, step.campaign_id.as_deref()))
        })
    }

    fn fallback_answer(steps: &[Step], impressions: Option<&CampaignImpressions>) -> String {
        let mut parts = Vec::new();

        if let Some(impressions) = impressions {
            let poster_note = match impressions.posters.len() {
                0 => String::new(),
                1 => " across 1 poster".to_owned(),
                n => format!(" across {n} posters"),
            };
            parts.push(format!(
                "Campaign {} received {} impressions{poster_note}.",
                impressions.campaign_id, impressions.impressions
            ));
        }

        let failures: Vec<&Step> = steps
            .iter()
            .filter(|step| !step.is_success() && step.tool != step_names::ROUND_LIMIT)
            .collect();
        if let Some(last) = failures.last() {
            let detail = last.error.as_deref().unwrap_or("no detail available");
            parts.push(if failures.len() == 1 {
                format!("The {} call failed: {detail}.", last.tool)
            } else {
                format!(
                    "{} tool calls failed; the last one ({}) reported: {detail}.",
                    failures.len(),
                    last.tool
                )
            });
        }

        if steps.iter().any(|step| step.tool == step_names::ROUND_LIMIT) {
            parts.push(
                "I could not finish the analysis within the allowed number of steps.".to_owned(),
            );
        }

        if parts.is_empty() {
            "I could not produce an answer for this request.".to_owned()
        } else {
            parts.join(" ")
        }
    }
}

// ============================================================================
// Shape Recognition
// ============================================================================

/// Recognize an impressions body, either top-level or under `data`
fn recognize_impressions(body: &Value, step_campaign: Option<&str>) -> Option<CampaignImpressions> {
    let object = body.as_object()?;
    parse_impressions(object, step_campaign).or_else(|| {
        object
            .get("data")
            .and_then(Value::as_object)
            .and_then(|inner| parse_impressions(inner, step_campaign))
    })
}

fn parse_impressions(object: &Map<String, Value>, step_campaign: Option<&str>) -> Option<CampaignImpressions> {
    let impressions = object.get("impressions").and_then(as_count)?;
    let campaign_id = object
        .get("campaign_id")
        .and_then(as_id)
        .or_else(|| step_campaign.map(ToOwned::to_owned))?;

    let posters = object
        .get("posters")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_poster).collect())
        .unwrap_or_default();

    Some(CampaignImpressions {
        campaign_id,
        impressions,
        posters,
    })
}

fn parse_poster(value: &Value) -> Option<PosterImpression> {
    let object = value.as_object()?;
    Some(PosterImpression {
        poster_id: object.get("poster_id").and_then(as_id)?,
        poster_name: object
            .get("poster_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        impressions: object.get("impressions").and_then(as_count)?,
        play_time: object.get("play_time").and_then(Value::as_f64),
    })
}

/// Ids are accepted as strings or integers
fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Counts are non-negative integers; integral floats are accepted
fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64)
            .map(|n| n as u64)
    })
}

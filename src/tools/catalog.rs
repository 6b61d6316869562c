// ABOUTME: Static catalog of gateway tools with typed arguments and JSON schemas
// ABOUTME: Resolves model-requested tool calls by name without touching the network
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tool Catalog
//!
//! The catalog is a name → handler table built once at startup. Each entry
//! carries the declaration advertised to the model and a parser that turns
//! the model's JSON arguments into a typed [`GatewayTool`].
//!
//! `CHAT_ENABLED_TOOLS` narrows the table; names outside the enabled set are
//! neither advertised nor accepted.

use std::fmt;

use adchat_core::constants::tools;
use adchat_core::errors::GatewayError;
use chrono::NaiveDate;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::llm::FunctionDeclaration;

/// Date format accepted for date-range arguments
const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Typed Arguments
// ============================================================================

/// Arguments of `get_impressions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpressionsArgs {
    /// Campaign to report on
    #[serde(deserialize_with = "string_or_number")]
    pub campaign_id: String,
    /// Inclusive start date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Inclusive end date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Arguments of `list_campaigns`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCampaignsArgs {
    /// Optional status filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Arguments of `get_campaign`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignArgs {
    /// Campaign to describe
    #[serde(deserialize_with = "string_or_number")]
    pub campaign_id: String,
}

/// Campaign ids arrive as strings or bare numbers depending on the model
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or integer id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_owned())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

// ============================================================================
// Tool Variants
// ============================================================================

/// A resolved tool call ready for the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayTool {
    /// Impression analytics for one campaign
    GetImpressions(ImpressionsArgs),
    /// Campaigns visible to the caller
    ListCampaigns(ListCampaignsArgs),
    /// Campaign metadata
    GetCampaign(CampaignArgs),
}

impl GatewayTool {
    /// Gateway tool name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetImpressions(_) => tools::GET_IMPRESSIONS,
            Self::ListCampaigns(_) => tools::LIST_CAMPAIGNS,
            Self::GetCampaign(_) => tools::GET_CAMPAIGN,
        }
    }

    /// Campaign targeted by the call, when the tool takes one
    #[must_use]
    pub fn campaign_id(&self) -> Option<&str> {
        match self {
            Self::GetImpressions(args) => Some(&args.campaign_id),
            Self::GetCampaign(args) => Some(&args.campaign_id),
            Self::ListCampaigns(_) => None,
        }
    }

    /// Normalized JSON arguments sent to the gateway
    #[must_use]
    pub fn arguments(&self) -> Value {
        match self {
            Self::GetImpressions(args) => serde_json::to_value(args),
            Self::ListCampaigns(args) => serde_json::to_value(args),
            Self::GetCampaign(args) => serde_json::to_value(args),
        }
        .unwrap_or_default()
    }
}

// ============================================================================
// Handler Table
// ============================================================================

type ParseFn = fn(Value) -> Result<GatewayTool, String>;

struct ToolSpec {
    name: &'static str,
    description: &'static str,
    parameters: fn() -> Value,
    parse: ParseFn,
}

static TOOL_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: tools::GET_IMPRESSIONS,
        description: "Get total impressions and the per-poster breakdown for a campaign, optionally limited to a date range.",
        parameters: impressions_schema,
        parse: parse_impressions,
    },
    ToolSpec {
        name: tools::LIST_CAMPAIGNS,
        description: "List the advertising campaigns visible to the caller, optionally filtered by status.",
        parameters: list_campaigns_schema,
        parse: parse_list_campaigns,
    },
    ToolSpec {
        name: tools::GET_CAMPAIGN,
        description: "Get metadata for one campaign: name, schedule, status, and posters.",
        parameters: campaign_schema,
        parse: parse_campaign,
    },
];

fn impressions_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "campaign_id": {"type": "string", "description": "Campaign identifier"},
            "start_date": {"type": "string", "description": "Inclusive start date, YYYY-MM-DD"},
            "end_date": {"type": "string", "description": "Inclusive end date, YYYY-MM-DD"}
        },
        "required": ["campaign_id"]
    })
}

fn list_campaigns_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "status": {
                "type": "string",
                "enum": ["active", "paused", "finished"],
                "description": "Only return campaigns with this status"
            }
        }
    })
}

fn campaign_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "campaign_id": {"type": "string", "description": "Campaign identifier"}
        },
        "required": ["campaign_id"]
    })
}

fn require_campaign_id(campaign_id: &str) -> Result<(), String> {
    if campaign_id.trim().is_empty() {
        return Err("campaign_id must not be empty".to_owned());
    }
    Ok(())
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map_err(|_| format!("{field} must use YYYY-MM-DD, got '{raw}'"))
        })
        .transpose()
}

fn parse_impressions(arguments: Value) -> Result<GatewayTool, String> {
    let args: ImpressionsArgs = serde_json::from_value(arguments).map_err(|e| e.to_string())?;
    require_campaign_id(&args.campaign_id)?;
    let start = parse_date("start_date", args.start_date.as_deref())?;
    let end = parse_date("end_date", args.end_date.as_deref())?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err("start_date must not be after end_date".to_owned());
        }
    }
    Ok(GatewayTool::GetImpressions(args))
}

fn parse_list_campaigns(arguments: Value) -> Result<GatewayTool, String> {
    let args: ListCampaignsArgs = serde_json::from_value(arguments).map_err(|e| e.to_string())?;
    Ok(GatewayTool::ListCampaigns(args))
}

fn parse_campaign(arguments: Value) -> Result<GatewayTool, String> {
    let args: CampaignArgs = serde_json::from_value(arguments).map_err(|e| e.to_string())?;
    require_campaign_id(&args.campaign_id)?;
    Ok(GatewayTool::GetCampaign(args))
}

// ============================================================================
// Catalog
// ============================================================================

/// The enabled subset of the tool table
#[derive(Clone)]
pub struct ToolCatalog {
    specs: Vec<&'static ToolSpec>,
    declarations: Vec<FunctionDeclaration>,
}

impl fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("tools", &self.names())
            .finish()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ToolCatalog {
    /// Build the catalog, optionally restricted to `enabled` tool names
    ///
    /// Unknown names in `enabled` are logged and ignored.
    #[must_use]
    pub fn new(enabled: Option<&[String]>) -> Self {
        if let Some(enabled) = enabled {
            for name in enabled {
                if !TOOL_SPECS.iter().any(|spec| spec.name == name) {
                    warn!(tool = %name, "Ignoring unknown tool in enabled tool list");
                }
            }
        }

        let specs: Vec<&'static ToolSpec> = TOOL_SPECS
            .iter()
            .filter(|spec| match enabled {
                Some(names) => names.iter().any(|n| n == spec.name),
                None => true,
            })
            .collect();

        let declarations = specs
            .iter()
            .map(|spec| FunctionDeclaration {
                name: spec.name.to_owned(),
                description: spec.description.to_owned(),
                parameters: (spec.parameters)(),
            })
            .collect();

        Self {
            specs,
            declarations,
        }
    }

    /// Tool schema advertised to the model
    #[must_use]
    pub fn declarations(&self) -> &[FunctionDeclaration] {
        &self.declarations
    }

    /// Names of the enabled tools
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.specs.iter().map(|spec| spec.name).collect()
    }

    /// Resolve a model-requested call into a typed tool
    ///
    /// # Errors
    ///
    /// Returns `UnknownTool` when `name` is not enabled and `InvalidArguments`
    /// when the arguments do not fit the tool's schema.
    pub fn resolve(&self, name: &str, arguments: &Value) -> Result<GatewayTool, GatewayError> {
        let spec = self
            .specs
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| GatewayError::UnknownTool {
                name: name.to_owned(),
            })?;

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => arguments.clone(),
            Value::String(raw) => {
                return Err(GatewayError::invalid_arguments(
                    name,
                    format!("arguments are not valid JSON: {raw}"),
                ))
            }
            other => {
                return Err(GatewayError::invalid_arguments(
                    name,
                    format!("arguments must be a JSON object, got {other}"),
                ))
            }
        };

        (spec.parse)(arguments).map_err(|reason| GatewayError::invalid_arguments(name, reason))
    }
}

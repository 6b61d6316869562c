// ABOUTME: Gateway tool catalog and client for executing model-requested tool calls
// ABOUTME: Closed set of tools with typed arguments, dispatched by name to the HTTP tool gateway
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tools
//!
//! The model may only request tools from a fixed catalog. A request is first
//! resolved against [`ToolCatalog`] into a typed [`GatewayTool`] (unknown names
//! and bad arguments fail here, before any network call), then executed through
//! a [`ToolGatewayClient`].

pub mod catalog;
pub mod gateway;

pub use catalog::{
    CampaignArgs, GatewayTool, ImpressionsArgs, ListCampaignsArgs, ToolCatalog,
};
pub use gateway::{GatewayResponse, HttpToolGateway, HttpToolGatewayConfig, ToolGatewayClient};

// ABOUTME: Server binary for the campaign analytics chat service
// ABOUTME: Loads configuration from the environment and serves the chat HTTP API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Adchat Server Binary
//!
//! Starts the HTTP chat API with the engine selected by configuration.

use std::sync::Arc;

use adchat_server::config::ServerConfig;
use adchat_server::logging;
use adchat_server::server::{serve, ServerResources};
use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "adchat-server")]
#[command(about = "Campaign analytics chat server - LLM tool orchestration over the campaign gateway")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Containers sometimes pass arguments clap does not expect
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Argument parsing failed: {e}");
            eprintln!("Using default configuration");
            Args { http_port: None }
        }
    };

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    info!("Starting campaign chat server");
    info!("{}", config.summary());

    let port = config.http_port;
    let resources = Arc::new(ServerResources::from_config(config).await?);
    info!(engine = resources.engine.mode(), "Server resources initialized");

    if let Err(e) = serve(resources, port).await {
        error!("Server error: {e:#}");
        return Err(e);
    }

    Ok(())
}

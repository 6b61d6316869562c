// ABOUTME: Shared server resources, router assembly, and the HTTP serve loop
// ABOUTME: Wires the conversation store and chat engine behind the axum router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::future::pending;
use std::net::SocketAddr;
use std::sync::Arc;

use adchat_core::constants::{headers, limits};
use adchat_core::errors::AppResult;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use http::HeaderName;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::database::{ChatStore, SqliteChatStore};
use crate::middleware::setup_cors;
use crate::routes::{ChatRoutes, HealthRoutes};
use crate::services::{build_engine, ChatEngine};

/// Resources shared by every request handler
pub struct ServerResources {
    /// Loaded configuration
    pub config: ServerConfig,
    /// Conversation persistence
    pub store: Arc<dyn ChatStore>,
    /// Engine executing chat turns
    pub engine: Arc<dyn ChatEngine>,
}

impl ServerResources {
    /// Bundle already-built collaborators
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<dyn ChatStore>, engine: Arc<dyn ChatEngine>) -> Self {
        Self {
            config,
            store,
            engine,
        }
    }

    /// Connect the store and build the engine selected by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated, or an
    /// HTTP client cannot be created.
    pub async fn from_config(config: ServerConfig) -> AppResult<Self> {
        let store: Arc<dyn ChatStore> = Arc::new(SqliteChatStore::connect(&config.database_url).await?);

        let engine = build_engine(&config, Arc::clone(&store))?;
        Ok(Self::new(config, store, engine))
    }
}

/// Assemble the full router with tracing, request ids, CORS, and body limits
#[must_use]
pub fn build_router(resources: &Arc<ServerResources>) -> Router {
    let request_id_header = HeaderName::from_static(headers::REQUEST_ID);

    Router::new()
        .merge(ChatRoutes::routes(Arc::clone(resources)))
        .merge(HealthRoutes::routes(Arc::clone(resources)))
        .layer(DefaultBodyLimit::max(limits::MAX_REQUEST_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    request_id_header.clone(),
                    MakeRequestUuid,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id_header))
                .layer(setup_cors(&resources.config)),
        )
}

/// Bind `port` and serve until Ctrl+C
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(resources: Arc<ServerResources>, port: u16) -> anyhow::Result<()> {
    let app = build_router(&resources);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {addr}"))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated with error")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for shutdown signal; serving until killed");
            pending::<()>().await;
        }
    }
}

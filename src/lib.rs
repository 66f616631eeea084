//! # Peitho - Dialogflow CX Bridge
//!
//! Peitho exposes Google Dialogflow CX agent sessions as Model Context
//! Protocol (MCP) tools, so an MCP host can drive a conversational agent
//! without talking to Google's API directly.
//!
//! ## Tools
//!
//! - **initialize_dialogflow**: bind a (project, location, agent) triple
//! - **detect_intent / detect_intent_from_audio / detect_intent_from_base64**:
//!   submit one turn and get a normalized result
//! - **match_intent**: classify without advancing dialogue state
//! - **parse_webhook_request / create_webhook_response**: translate
//!   fulfillment payloads
//! - **check_end_interaction**: read the closure flag off a result
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peitho::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let settings = Settings::new()?;
//!
//!     // Server will start on configured host:port
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Peitho follows Hexagonal Architecture:
//! - **Domain**: normalized turn types and the sessions port
//! - **Dialogflow**: REST client and webhook translation behind the port
//! - **Adapters**: MCP server, tool dispatch, health and webhook endpoints
//! - **Config**: configuration management

pub mod adapters;
pub mod cli;
pub mod config;
pub mod dialogflow;
pub mod domain;
pub mod error;

use crate::adapters::health_handler::HealthHandler;
use crate::adapters::rmcp_server::PeithoServer;
use crate::adapters::webhook_handler::WebhookHandler;
use crate::config::WebhookSettings;
use axum::{
    routing::{get, post},
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `server` - MCP server implementation using rmcp SDK
/// * `webhook` - Fulfillment endpoint settings; the route is only mounted
///   when enabled
///
/// # Returns
///
/// Configured Axum Router
pub async fn create_app(server: PeithoServer, webhook: WebhookSettings) -> Router {
    let health_handler = Arc::new(HealthHandler::new(server.tool_handler()));

    // Create rmcp HTTP transport service
    let session_manager = Arc::new(LocalSessionManager::default());
    let config = StreamableHttpServerConfig::default();
    let mcp_service = StreamableHttpService::new(move || Ok(server.clone()), session_manager, config);

    let mut router = Router::new()
        // Health check endpoints
        .route(
            "/health",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.health().await }
                }
            }),
        )
        .route(
            "/health/ready",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.ready().await }
                }
            }),
        )
        .route(
            "/health/live",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.live().await }
                }
            }),
        )
        // MCP protocol endpoint using rmcp streamable HTTP transport
        .nest_service("/mcp", mcp_service);

    // Fulfillment endpoint, mounted only when configured
    if webhook.enabled {
        let webhook_handler = Arc::new(WebhookHandler::new(webhook));
        router = router.route(
            "/webhook",
            post(move |Json(body): Json<serde_json::Value>| {
                let h = webhook_handler.clone();
                async move { h.fulfill(body).await }
            }),
        );
    }

    router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}

use clap::Parser;
use peitho::adapters::rmcp_server::PeithoServer;
use peitho::adapters::tool_handler::BridgeToolHandler;
use peitho::cli::{Cli, Transport};
use peitho::config::Settings;
use rmcp::{transport::stdio, ServiceExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing. Under stdio the protocol owns stdout, so logs
    // go to stderr there.
    match cli.transport {
        Transport::Stdio => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init(),
        Transport::Http => tracing_subscriber::fmt::init(),
    }

    // Load configuration
    let settings = Settings::new_with_cli(&cli)?;

    // Bind the configured agent eagerly when the config names one
    let tools = Arc::new(BridgeToolHandler::new(settings.dialogflow.clone()));
    match tools.initialize_from_settings().await {
        Ok(true) => {}
        Ok(false) => info!("No agent configured; waiting for initialize_dialogflow"),
        Err(e) => warn!("Failed to initialize Dialogflow client from configuration: {}", e),
    }

    let server = PeithoServer::new(tools);

    match cli.transport {
        Transport::Stdio => {
            info!("Starting Peitho MCP server on stdio");
            let service = server.serve(stdio()).await?;
            service.waiting().await?;
        }
        Transport::Http => {
            let host = settings.server.host.clone();
            let port = settings.server.port;
            info!("Starting Peitho MCP server on {}:{}", host, port);

            // Create application using the library function
            let app = peitho::create_app(server, settings.webhook.clone()).await;

            // Start server
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            info!("Listening on {}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

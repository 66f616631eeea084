//! RMCP Server Adapter
//!
//! MCP server implementation using the official rmcp SDK. It exposes the
//! bridge's tool catalog over the protocol and maps bridge errors onto
//! protocol error codes, carrying the stable error kind in the error data
//! so hosts can branch on it.

use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::tool_handler::BridgeToolHandler;
use crate::error::BridgeError;

/// Peitho MCP server.
///
/// Cloned per transport session; all clones share one tool handler and
/// therefore one client holder slot.
#[derive(Clone)]
pub struct PeithoServer {
    tools: Arc<BridgeToolHandler>,
}

impl PeithoServer {
    pub fn new(tools: Arc<BridgeToolHandler>) -> Self {
        Self { tools }
    }

    pub fn tool_handler(&self) -> Arc<BridgeToolHandler> {
        self.tools.clone()
    }
}

impl ServerHandler for PeithoServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "peitho".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Dialogflow CX bridge. Bind an agent with initialize_dialogflow (or configure one at startup), \
                 then drive conversations with detect_intent, detect_intent_from_audio, detect_intent_from_base64 \
                 and match_intent; parse_webhook_request and create_webhook_response translate fulfillment payloads."
                    .to_string(),
            ),
        }
    }

    fn ping(
        &self,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<(), McpError>> + Send + '_ {
        async move {
            info!("MCP ping received");
            Ok(())
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let handler = self.tools.clone();
        async move {
            let tools: Vec<Tool> = handler
                .list_tools()
                .into_iter()
                .map(|t| {
                    // Input schema should be a JSON object
                    let schema = match t.input_schema {
                        serde_json::Value::Object(obj) => obj,
                        _ => serde_json::Map::new(),
                    };
                    Tool::new(t.name, t.description, schema)
                })
                .collect();

            Ok(ListToolsResult {
                tools,
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let handler = self.tools.clone();
        async move {
            let name = request.name.as_ref();
            let args = request
                .arguments
                .map(serde_json::Value::Object)
                .unwrap_or(serde_json::Value::Null);

            let result = handler.execute_tool(name, args).await.map_err(|e| {
                warn!(tool = name, error = %e, "tool call failed");
                to_mcp_error(e)
            })?;

            let text = if let Some(s) = result.as_str() {
                s.to_string()
            } else {
                result.to_string()
            };

            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
    }
}

/// Map a bridge failure onto a protocol error, keeping the kind tag in the
/// error data.
fn to_mcp_error(err: BridgeError) -> McpError {
    let data = Some(json!({ "kind": err.kind() }));
    match err {
        BridgeError::DetectionFailed(_) => McpError::internal_error(err.to_string(), data),
        BridgeError::Configuration(_)
        | BridgeError::Uninitialized
        | BridgeError::MalformedPayload(_)
        | BridgeError::InvalidInput(_) => McpError::invalid_params(err.to_string(), data),
    }
}

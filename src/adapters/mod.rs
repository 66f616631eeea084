pub mod health_handler;
pub mod rmcp_server;
pub mod tool_handler;
pub mod webhook_handler;

//! HTTP endpoint for Dialogflow CX fulfillment calls.
//!
//! Dialogflow calls this endpoint mid-turn when a page or route has a
//! webhook attached. The reply is static, configured under `[webhook]`:
//! the configured messages, plus the inbound session parameters echoed
//! back when enabled. Anything smarter belongs in the MCP host driving
//! the conversation, not in the bridge.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use tracing::info;

use crate::config::WebhookSettings;
use crate::dialogflow::webhook;
use crate::domain::{FulfillmentMessage, FulfillmentSpec};

pub struct WebhookHandler {
    settings: WebhookSettings,
}

impl WebhookHandler {
    pub fn new(settings: WebhookSettings) -> Self {
        Self { settings }
    }

    /// Answer one fulfillment call.
    pub async fn fulfill(&self, body: Value) -> impl IntoResponse {
        match webhook::parse_request(&body) {
            Ok(request) => {
                info!(
                    intent = request.intent_name.as_deref().unwrap_or("-"),
                    tag = request.tag.as_deref().unwrap_or("-"),
                    "fulfillment call"
                );

                let spec = FulfillmentSpec {
                    messages: self
                        .settings
                        .reply_messages
                        .iter()
                        .cloned()
                        .map(FulfillmentMessage::Plain)
                        .collect(),
                    parameter_updates: if self.settings.echo_parameters {
                        request.parameters
                    } else {
                        None
                    },
                    target_page: None,
                    target_flow: None,
                };

                (StatusCode::OK, Json(webhook::build_response(&spec)))
            }
            Err(e) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string(), "kind": e.kind() })),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> WebhookSettings {
        WebhookSettings {
            enabled: true,
            reply_messages: vec!["One moment.".to_string()],
            echo_parameters: true,
        }
    }

    #[tokio::test]
    async fn test_fulfill_answers_with_configured_messages() {
        let handler = WebhookHandler::new(settings());
        let body = json!({
            "fulfillmentInfo": { "tag": "lookup" },
            "sessionInfo": {
                "session": "projects/p/locations/l/agents/a/sessions/s-1",
                "parameters": { "order_id": "42" }
            }
        });

        let response = handler.fulfill(body).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_fulfill_rejects_non_object_body() {
        let handler = WebhookHandler::new(settings());

        let response = handler.fulfill(json!("nope")).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

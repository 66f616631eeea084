//! Webhook fulfillment translation.
//!
//! Two pure mappings between Dialogflow CX's fulfillment wire schema and
//! the normalized shapes the rest of the bridge uses. Inbound parsing is
//! tolerant: fulfillment calls vary by trigger, so every extracted field
//! may be absent and maps to `None`. Input that is not a JSON object at
//! all fails closed with a malformed-payload error.

use serde_json::{json, Map, Value};

use crate::domain::{FulfillmentMessage, FulfillmentSpec, TurnMessage, WebhookRequest};
use crate::error::{BridgeError, BridgeResult};

/// Parse an inbound fulfillment call into a [`WebhookRequest`].
pub fn parse_request(raw: &Value) -> BridgeResult<WebhookRequest> {
    let Some(root) = raw.as_object() else {
        return Err(BridgeError::MalformedPayload(
            "webhook request must be a JSON object".to_string(),
        ));
    };

    let session_info = root.get("sessionInfo");
    let text = string_field(raw, &["text"])
        .or_else(|| string_field(raw, &["transcript"]))
        .or_else(|| string_field(raw, &["triggerEvent"]));

    Ok(WebhookRequest {
        session_id: string_field(raw, &["sessionInfo", "session"]),
        intent_name: string_field(raw, &["intentInfo", "displayName"]),
        parameters: session_info
            .and_then(|s| s.get("parameters"))
            .and_then(|p| p.as_object().cloned()),
        current_page: string_field(raw, &["pageInfo", "displayName"]),
        text,
        language_code: string_field(raw, &["languageCode"]),
        tag: string_field(raw, &["fulfillmentInfo", "tag"]),
        messages: parse_messages(root.get("messages")),
    })
}

/// Parse a fulfillment call supplied as a JSON string.
pub fn parse_request_json(raw: &str) -> BridgeResult<WebhookRequest> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| BridgeError::MalformedPayload(format!("invalid JSON: {}", e)))?;
    parse_request(&value)
}

/// Build the wire reply Dialogflow CX expects from a fulfillment webhook.
///
/// Message order and parameter-update keys pass through exactly as given;
/// `fulfillmentResponse` is always present even when there is nothing to
/// say.
pub fn build_response(spec: &FulfillmentSpec) -> Value {
    let mut fulfillment = Map::new();
    if !spec.messages.is_empty() {
        let messages: Vec<Value> = spec.messages.iter().map(render_message).collect();
        fulfillment.insert("messages".to_string(), Value::Array(messages));
    }

    let mut response = Map::new();
    response.insert(
        "fulfillmentResponse".to_string(),
        Value::Object(fulfillment),
    );
    if let Some(updates) = &spec.parameter_updates {
        response.insert(
            "sessionInfo".to_string(),
            json!({ "parameters": updates }),
        );
    }
    if let Some(page) = &spec.target_page {
        response.insert("targetPage".to_string(), Value::String(page.clone()));
    }
    if let Some(flow) = &spec.target_flow {
        response.insert("targetFlow".to_string(), Value::String(flow.clone()));
    }

    Value::Object(response)
}

fn render_message(message: &FulfillmentMessage) -> Value {
    match message {
        FulfillmentMessage::Plain(text) => json!({ "text": { "text": [text] } }),
        FulfillmentMessage::Text { text } => json!({ "text": { "text": [text] } }),
        FulfillmentMessage::Payload { payload } => json!({ "payload": payload }),
    }
}

fn parse_messages(raw: Option<&Value>) -> Vec<TurnMessage> {
    let Some(items) = raw.and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut messages = Vec::new();
    for item in items {
        if let Some(text) = item.get("text").and_then(|t| t.get("text")) {
            let segments: Vec<&str> = text
                .as_array()
                .map(|a| a.iter().filter_map(|s| s.as_str()).collect())
                .unwrap_or_default();
            if !segments.is_empty() {
                messages.push(TurnMessage::Text(segments.join("\n")));
            }
        } else if let Some(payload) = item.get("payload") {
            messages.push(TurnMessage::Payload(payload.clone()));
        }
    }
    messages
}

fn string_field(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str().map(|s| s.to_string())
}

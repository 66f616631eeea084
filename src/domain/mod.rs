//! Normalized domain types for the bridge.
//!
//! Everything the MCP tools accept or return lives here, decoupled from the
//! Dialogflow CX wire schema in `crate::dialogflow`. Absence is always an
//! explicit `Option`, never a sentinel value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod audio;

pub use audio::{AudioConfig, AudioEncoding};

use crate::error::BridgeResult;

/// One output message from a dialogue turn, in delivery order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum TurnMessage {
    /// Literal text segments, joined with newlines
    Text(String),
    /// Custom structured payload passed through unchanged
    Payload(Value),
}

/// The top intent matched for a turn.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MatchedIntent {
    pub name: String,
    pub confidence: f32,
}

/// Normalized outcome of a single dialogue turn.
///
/// `session_id` echoes the id the turn ran under so the caller can continue
/// the same conversation. `intent`, `parameters` and `current_page` are
/// `None` when the remote reported nothing for them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectionResult {
    pub messages: Vec<TurnMessage>,
    pub intent: Option<MatchedIntent>,
    pub parameters: Option<Map<String, Value>>,
    pub current_page: Option<String>,
    /// Recognized speech for audio turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    pub session_id: String,
    pub end_interaction: bool,
}

/// One unit of user input for a single turn.
#[derive(Debug, Clone)]
pub enum Utterance {
    Text { text: String },
    Audio { audio: Vec<u8>, config: AudioConfig },
}

/// Whether a turn commits to the session or only probes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectMode {
    /// Normal turn: remote dialogue state may advance
    Advance,
    /// Match-only probe: remote state is not advanced or persisted
    Preserve,
}

/// Normalized view of an inbound Dialogflow CX fulfillment call.
///
/// Fulfillment payloads vary by trigger; every field here may legitimately
/// be absent and parses to `None` rather than failing.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WebhookRequest {
    pub session_id: Option<String>,
    pub intent_name: Option<String>,
    pub parameters: Option<Map<String, Value>>,
    pub current_page: Option<String>,
    /// Conversation text for the turn: user text, else transcript, else
    /// the triggering event name
    pub text: Option<String>,
    pub language_code: Option<String>,
    /// Webhook tag configured on the fulfillment
    pub tag: Option<String>,
    #[serde(default)]
    pub messages: Vec<TurnMessage>,
}

/// One message in a caller-supplied fulfillment reply.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum FulfillmentMessage {
    /// Bare string, becomes one text segment
    Plain(String),
    /// Already-shaped text message
    Text { text: String },
    /// Custom payload passed through unchanged
    Payload { payload: Value },
}

/// Caller-supplied structure for building a fulfillment reply.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct FulfillmentSpec {
    #[serde(default)]
    pub messages: Vec<FulfillmentMessage>,
    #[serde(default)]
    pub parameter_updates: Option<Map<String, Value>>,
    #[serde(default)]
    pub target_page: Option<String>,
    #[serde(default)]
    pub target_flow: Option<String>,
}

/// Port for submitting one dialogue turn against a remote session.
///
/// The single suspension point of the bridge; id generation and payload
/// mapping around it stay synchronous.
#[async_trait]
pub trait SessionsPort: Send + Sync {
    /// Submit `utterance` under `session_id` and return the normalized
    /// result. `language_code` falls back to the handle's configured
    /// default when `None`.
    async fn detect(
        &self,
        session_id: &str,
        utterance: Utterance,
        language_code: Option<&str>,
        mode: DetectMode,
    ) -> BridgeResult<DetectionResult>;
}

//! Dialogflow CX v3 wire types.
//!
//! Typed views of the response shapes the sessions API returns. Every field
//! the remote may omit is an `Option`; unknown fields are ignored. Only the
//! fields the bridge reads are modeled.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Response to `sessions:detectIntent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentResponse {
    pub response_id: Option<String>,
    pub query_result: Option<QueryResult>,
}

/// Result of one processed conversational query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Conversational text input, echoed for text turns
    pub text: Option<String>,
    /// Recognized speech for audio turns
    pub transcript: Option<String>,
    pub language_code: Option<String>,
    #[serde(default)]
    pub response_messages: Vec<ResponseMessage>,
    pub current_page: Option<Page>,
    #[serde(rename = "match")]
    pub intent_match: Option<IntentMatch>,
    pub parameters: Option<Map<String, Value>>,
}

/// One rich response message from the agent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub text: Option<TextMessage>,
    pub payload: Option<Map<String, Value>>,
    /// Present (as an empty object) when the agent signals the
    /// conversation is over
    pub end_interaction: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TextMessage {
    #[serde(default)]
    pub text: Vec<String>,
}

/// A page in the agent's flow graph.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub name: Option<String>,
    pub display_name: Option<String>,
}

/// One intent match candidate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMatch {
    pub intent: Option<Intent>,
    pub confidence: Option<f32>,
    pub parameters: Option<Map<String, Value>>,
    pub match_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: Option<String>,
    pub display_name: Option<String>,
}

/// Response to `sessions:matchIntent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchIntentResponse {
    #[serde(default)]
    pub matches: Vec<IntentMatch>,
    pub current_page: Option<Page>,
    pub text: Option<String>,
    pub transcript: Option<String>,
}

//! Sessions client for the Dialogflow CX v3 REST API.
//!
//! One client is bound to one agent address and one resolved credential. The
//! two remote surfaces it speaks are `sessions:detectIntent` (a committing
//! turn) and `sessions:matchIntent` (a state-preserving probe); both funnel
//! through the same request builder and the same normalization.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dialogflow::session::AgentAddress;
use crate::dialogflow::types::{DetectIntentResponse, MatchIntentResponse};
use crate::domain::{DetectMode, DetectionResult, MatchedIntent, SessionsPort, TurnMessage, Utterance};
use crate::error::{BridgeError, BridgeResult};

/// Environment variable holding a bearer token directly.
pub const ACCESS_TOKEN_ENV: &str = "DIALOGFLOW_ACCESS_TOKEN";

/// Environment variable naming a file that holds a bearer token.
pub const TOKEN_FILE_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS_TOKEN";

/// Options resolved once when a client is constructed.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// File containing a bearer token; ambient discovery when `None`
    pub credentials_path: Option<PathBuf>,
    /// Default language for turns that do not specify one
    pub language_code: String,
    /// Bound on every outbound call
    pub timeout: Duration,
    /// Base URL override, used to point tests at a fake backend
    pub endpoint: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            credentials_path: None,
            language_code: "en-US".to_string(),
            timeout: Duration::from_secs(30),
            endpoint: None,
        }
    }
}

/// HTTP client for one agent's sessions surface.
#[derive(Debug)]
pub struct SessionsClient {
    client: reqwest::Client,
    address: AgentAddress,
    endpoint: String,
    token: String,
    default_language: String,
}

impl SessionsClient {
    /// Build a client, resolving credentials and fixing the endpoint.
    ///
    /// Fails with a configuration error when credentials cannot be
    /// resolved; token provisioning itself is external to the bridge.
    pub fn new(address: AgentAddress, options: ClientOptions) -> BridgeResult<Self> {
        let token = resolve_token(options.credentials_path.as_deref())?;
        let endpoint = options
            .endpoint
            .clone()
            .unwrap_or_else(|| address.default_endpoint());
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| {
                BridgeError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            address,
            endpoint,
            token,
            default_language: options.language_code,
        })
    }

    pub fn address(&self) -> &AgentAddress {
        &self.address
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    async fn post<T: DeserializeOwned>(&self, url: &str, body: &Value) -> BridgeResult<T> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BridgeError::DetectionFailed(format!(
                "{}: {}",
                status.as_u16(),
                remote_error_message(&error_text)
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BridgeError::DetectionFailed(format!("failed to parse response: {}", e)))
    }
}

#[async_trait]
impl SessionsPort for SessionsClient {
    async fn detect(
        &self,
        session_id: &str,
        utterance: Utterance,
        language_code: Option<&str>,
        mode: DetectMode,
    ) -> BridgeResult<DetectionResult> {
        validate_utterance(&utterance)?;

        let language = language_code.unwrap_or(&self.default_language);
        let session_path = self.address.session_path(session_id);
        let query_input = build_query_input(&utterance, language);

        match mode {
            DetectMode::Advance => {
                let url = format!("{}/{}:detectIntent", self.endpoint, session_path);
                let body = json!({ "queryInput": query_input });
                let response: DetectIntentResponse = self.post(&url, &body).await?;
                Ok(normalize_detect(response, session_id))
            }
            DetectMode::Preserve => {
                let url = format!("{}/{}:matchIntent", self.endpoint, session_path);
                let body = json!({
                    "queryInput": query_input,
                    "persistParameterChanges": false,
                });
                let response: MatchIntentResponse = self.post(&url, &body).await?;
                Ok(normalize_match(response, session_id))
            }
        }
    }
}

/// Reject empty utterances before any request is built.
pub(crate) fn validate_utterance(utterance: &Utterance) -> BridgeResult<()> {
    match utterance {
        Utterance::Text { text } if text.trim().is_empty() => Err(BridgeError::InvalidInput(
            "text must not be empty".to_string(),
        )),
        Utterance::Audio { audio, .. } if audio.is_empty() => Err(BridgeError::InvalidInput(
            "audio payload must not be empty".to_string(),
        )),
        _ => Ok(()),
    }
}

fn build_query_input(utterance: &Utterance, language_code: &str) -> Value {
    match utterance {
        Utterance::Text { text } => json!({
            "text": { "text": text },
            "languageCode": language_code,
        }),
        Utterance::Audio { audio, config } => json!({
            "audio": {
                "config": {
                    "audioEncoding": config.encoding.as_str(),
                    "sampleRateHertz": config.sample_rate_hertz,
                    "singleUtterance": config.single_utterance,
                },
                "audio": general_purpose::STANDARD.encode(audio),
            },
            "languageCode": language_code,
        }),
    }
}

/// Pull the human-readable message out of a Google error envelope, falling
/// back to the raw body.
fn remote_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.to_string())
}

pub(crate) fn normalize_detect(response: DetectIntentResponse, session_id: &str) -> DetectionResult {
    let Some(query) = response.query_result else {
        return empty_result(session_id);
    };

    let mut messages = Vec::new();
    let mut end_interaction = false;
    for message in &query.response_messages {
        if message.end_interaction.is_some() {
            end_interaction = true;
        }
        if let Some(text) = &message.text {
            if !text.text.is_empty() {
                messages.push(TurnMessage::Text(text.text.join("\n")));
            }
        } else if let Some(payload) = &message.payload {
            messages.push(TurnMessage::Payload(Value::Object(payload.clone())));
        }
    }

    let intent = query.intent_match.as_ref().and_then(|m| {
        let name = m.intent.as_ref()?.display_name.clone()?;
        Some(MatchedIntent {
            name,
            confidence: m.confidence.unwrap_or(0.0),
        })
    });

    DetectionResult {
        messages,
        intent,
        parameters: query.parameters,
        current_page: query.current_page.and_then(|p| p.display_name),
        transcript: query.transcript,
        session_id: session_id.to_string(),
        end_interaction,
    }
}

pub(crate) fn normalize_match(response: MatchIntentResponse, session_id: &str) -> DetectionResult {
    let top = response.matches.iter().max_by(|a, b| {
        a.confidence
            .unwrap_or(0.0)
            .partial_cmp(&b.confidence.unwrap_or(0.0))
            .unwrap_or(Ordering::Equal)
    });

    let intent = top.and_then(|m| {
        let name = m.intent.as_ref()?.display_name.clone()?;
        Some(MatchedIntent {
            name,
            confidence: m.confidence.unwrap_or(0.0),
        })
    });
    let parameters = top.and_then(|m| m.parameters.clone());

    DetectionResult {
        messages: Vec::new(),
        intent,
        parameters,
        current_page: response.current_page.and_then(|p| p.display_name),
        transcript: response.transcript,
        session_id: session_id.to_string(),
        end_interaction: false,
    }
}

fn empty_result(session_id: &str) -> DetectionResult {
    DetectionResult {
        messages: Vec::new(),
        intent: None,
        parameters: None,
        current_page: None,
        transcript: None,
        session_id: session_id.to_string(),
        end_interaction: false,
    }
}

/// Resolve a bearer token: explicit file first, then ambient discovery.
fn resolve_token(credentials_path: Option<&Path>) -> BridgeResult<String> {
    if let Some(path) = credentials_path {
        return read_token_file(path);
    }

    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }

    if let Ok(path) = std::env::var(TOKEN_FILE_ENV) {
        if !path.trim().is_empty() {
            return read_token_file(Path::new(path.trim()));
        }
    }

    Err(BridgeError::Configuration(format!(
        "credentials could not be resolved: pass credentials_path, or set {} or {}",
        ACCESS_TOKEN_ENV, TOKEN_FILE_ENV
    )))
}

fn read_token_file(path: &Path) -> BridgeResult<String> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        BridgeError::Configuration(format!(
            "failed to read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(BridgeError::Configuration(format!(
            "credentials file {} is empty",
            path.display()
        )));
    }
    Ok(token.to_string())
}

//! Tool dispatch for the bridge.
//!
//! `BridgeToolHandler` owns the one piece of process-wide mutable state:
//! the client holder slot. Initialization swaps the whole client behind
//! the slot; detection tools take a snapshot of the current client and
//! release the lock before going to the network, so a concurrent
//! re-initialization never tears a call in half.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::DialogflowSettings;
use crate::dialogflow::webhook;
use crate::dialogflow::{resolve_session_id, AgentAddress, SessionsClient};
use crate::domain::{AudioConfig, DetectMode, FulfillmentSpec, SessionsPort, Utterance};
use crate::error::{BridgeError, BridgeResult};

/// One entry in the tool catalog.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Executes bridge tools against the currently initialized client.
pub struct BridgeToolHandler {
    holder: Arc<RwLock<Option<Arc<dyn SessionsPort>>>>,
    defaults: DialogflowSettings,
}

#[derive(Deserialize)]
struct InitializeArgs {
    project_id: String,
    location: String,
    agent_id: String,
    credentials_path: Option<PathBuf>,
    language_code: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Deserialize)]
struct DetectTextArgs {
    text: String,
    session_id: Option<String>,
    language_code: Option<String>,
}

#[derive(Deserialize)]
struct DetectAudioFileArgs {
    audio_file_path: PathBuf,
    session_id: Option<String>,
    sample_rate_hertz: Option<u32>,
    audio_encoding: Option<String>,
    language_code: Option<String>,
}

#[derive(Deserialize)]
struct DetectAudioBase64Args {
    audio_base64: String,
    session_id: Option<String>,
    sample_rate_hertz: Option<u32>,
    audio_encoding: Option<String>,
    language_code: Option<String>,
}

#[derive(Deserialize)]
struct ParseWebhookArgs {
    request_json: Value,
}

#[derive(Deserialize)]
struct CreateWebhookArgs {
    fulfillment: Value,
}

#[derive(Deserialize)]
struct CheckEndInteractionArgs {
    response: Value,
}

impl BridgeToolHandler {
    pub fn new(defaults: DialogflowSettings) -> Self {
        Self {
            holder: Arc::new(RwLock::new(None)),
            defaults,
        }
    }

    /// Handler whose slot is pre-filled, bypassing client construction.
    pub fn with_port(defaults: DialogflowSettings, port: Arc<dyn SessionsPort>) -> Self {
        Self {
            holder: Arc::new(RwLock::new(Some(port))),
            defaults,
        }
    }

    /// Whether a client is currently bound.
    pub async fn initialized(&self) -> bool {
        self.holder.read().await.is_some()
    }

    /// Initialize from the configured binding, when it is complete.
    ///
    /// Returns `Ok(false)` when the config does not name all three agent
    /// identity fields; hosts then bind via the initialize tool instead.
    pub async fn initialize_from_settings(&self) -> BridgeResult<bool> {
        let Some((project_id, location, agent_id)) = self.defaults.configured_address() else {
            return Ok(false);
        };

        let address = AgentAddress::new(&project_id, &location, &agent_id)?;
        let client = SessionsClient::new(address, self.defaults.client_options())?;
        let agent = client.address().agent_path();
        self.store(Arc::new(client)).await;
        info!(agent = %agent, "Dialogflow client initialized from configuration");
        Ok(true)
    }

    /// The static tool catalog.
    pub fn list_tools(&self) -> Vec<ToolSpec> {
        tool_catalog()
    }

    /// Dispatch one tool invocation.
    pub async fn execute_tool(&self, name: &str, args: Value) -> BridgeResult<Value> {
        debug!(tool = name, "executing tool");
        match name {
            "initialize_dialogflow" => self.initialize(parse_args(args)?).await,
            "detect_intent" => {
                self.detect_text(parse_args(args)?, DetectMode::Advance).await
            }
            "match_intent" => {
                self.detect_text(parse_args(args)?, DetectMode::Preserve).await
            }
            "detect_intent_from_audio" => self.detect_audio_file(parse_args(args)?).await,
            "detect_intent_from_base64" => self.detect_audio_base64(parse_args(args)?).await,
            "parse_webhook_request" => parse_webhook_request(parse_args(args)?),
            "create_webhook_response" => create_webhook_response(parse_args(args)?),
            "check_end_interaction" => check_end_interaction(parse_args(args)?),
            _ => Err(BridgeError::InvalidInput(format!("unknown tool: {}", name))),
        }
    }

    async fn initialize(&self, args: InitializeArgs) -> BridgeResult<Value> {
        let address = AgentAddress::new(&args.project_id, &args.location, &args.agent_id)?;

        let mut options = self.defaults.client_options();
        if args.credentials_path.is_some() {
            options.credentials_path = args.credentials_path;
        }
        if let Some(language_code) = args.language_code {
            options.language_code = language_code;
        }
        if let Some(timeout_seconds) = args.timeout_seconds {
            options.timeout = Duration::from_secs(timeout_seconds);
        }

        let client = SessionsClient::new(address, options)?;
        let agent = client.address().agent_path();
        self.store(Arc::new(client)).await;
        info!(agent = %agent, "Dialogflow client initialized");
        Ok(Value::String(format!(
            "Initialized Dialogflow CX client for {}",
            agent
        )))
    }

    async fn detect_text(&self, args: DetectTextArgs, mode: DetectMode) -> BridgeResult<Value> {
        let port = self.port().await?;
        let session_id = resolve_session_id(args.session_id.as_deref());
        let result = port
            .detect(
                &session_id,
                Utterance::Text { text: args.text },
                args.language_code.as_deref(),
                mode,
            )
            .await?;
        Ok(render(&result))
    }

    async fn detect_audio_file(&self, args: DetectAudioFileArgs) -> BridgeResult<Value> {
        let config = AudioConfig::resolve(args.sample_rate_hertz, args.audio_encoding.as_deref())
            .map_err(BridgeError::InvalidInput)?;
        let audio = tokio::fs::read(&args.audio_file_path).await.map_err(|e| {
            BridgeError::InvalidInput(format!(
                "failed to read audio file {}: {}",
                args.audio_file_path.display(),
                e
            ))
        })?;

        self.detect_audio(audio, config, args.session_id, args.language_code)
            .await
    }

    async fn detect_audio_base64(&self, args: DetectAudioBase64Args) -> BridgeResult<Value> {
        use base64::{engine::general_purpose, Engine as _};

        let config = AudioConfig::resolve(args.sample_rate_hertz, args.audio_encoding.as_deref())
            .map_err(BridgeError::InvalidInput)?;
        let audio = general_purpose::STANDARD
            .decode(args.audio_base64.trim())
            .map_err(|e| BridgeError::InvalidInput(format!("invalid base64 audio: {}", e)))?;

        self.detect_audio(audio, config, args.session_id, args.language_code)
            .await
    }

    async fn detect_audio(
        &self,
        audio: Vec<u8>,
        config: AudioConfig,
        session_id: Option<String>,
        language_code: Option<String>,
    ) -> BridgeResult<Value> {
        let port = self.port().await?;
        let session_id = resolve_session_id(session_id.as_deref());
        let result = port
            .detect(
                &session_id,
                Utterance::Audio { audio, config },
                language_code.as_deref(),
                DetectMode::Advance,
            )
            .await?;
        Ok(render(&result))
    }

    /// Snapshot of the current client. The read lock is released before the
    /// caller awaits the network, so re-initialization is never blocked by
    /// an in-flight call and never observed half-applied.
    async fn port(&self) -> BridgeResult<Arc<dyn SessionsPort>> {
        let slot = self.holder.read().await;
        slot.as_ref().cloned().ok_or(BridgeError::Uninitialized)
    }

    async fn store(&self, port: Arc<dyn SessionsPort>) {
        let mut slot = self.holder.write().await;
        *slot = Some(port);
    }
}

fn parse_webhook_request(args: ParseWebhookArgs) -> BridgeResult<Value> {
    let parsed = match args.request_json {
        Value::String(raw) => webhook::parse_request_json(&raw)?,
        other => webhook::parse_request(&other)?,
    };
    Ok(render(&parsed))
}

fn create_webhook_response(args: CreateWebhookArgs) -> BridgeResult<Value> {
    let spec: FulfillmentSpec = serde_json::from_value(args.fulfillment)
        .map_err(|e| BridgeError::MalformedPayload(format!("invalid fulfillment: {}", e)))?;
    Ok(webhook::build_response(&spec))
}

fn check_end_interaction(args: CheckEndInteractionArgs) -> BridgeResult<Value> {
    let ended = args
        .response
        .get("end_interaction")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    Ok(Value::Bool(ended))
}

fn parse_args<T: DeserializeOwned>(args: Value) -> BridgeResult<T> {
    serde_json::from_value(args)
        .map_err(|e| BridgeError::InvalidInput(format!("invalid arguments: {}", e)))
}

fn render<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn tool_catalog() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "initialize_dialogflow",
            description: "Initialize the Dialogflow CX client for a (project, location, agent) binding. Replaces any existing binding.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project_id": {"type": "string", "description": "Google Cloud project id"},
                    "location": {"type": "string", "description": "Agent location, e.g. \"us-central1\" or \"global\""},
                    "agent_id": {"type": "string", "description": "Dialogflow CX agent id"},
                    "credentials_path": {"type": "string", "description": "Optional path to a file containing a bearer token"},
                    "language_code": {"type": "string", "description": "Default language code for turns, e.g. \"en-US\""},
                    "timeout_seconds": {"type": "integer", "description": "Timeout for Dialogflow calls in seconds"}
                },
                "required": ["project_id", "location", "agent_id"]
            }),
        },
        ToolSpec {
            name: "detect_intent",
            description: "Send a text utterance to the agent and return the normalized result. Advances dialogue state.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "User text for this turn"},
                    "session_id": {"type": "string", "description": "Conversation id; generated when omitted"},
                    "language_code": {"type": "string", "description": "Language of the utterance"}
                },
                "required": ["text"]
            }),
        },
        ToolSpec {
            name: "detect_intent_from_audio",
            description: "Send an audio file to the agent and return the normalized result, including the recognized transcript.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "audio_file_path": {"type": "string", "description": "Path to the audio file"},
                    "session_id": {"type": "string", "description": "Conversation id; generated when omitted"},
                    "sample_rate_hertz": {"type": "integer", "description": "Sample rate of the audio, default 16000"},
                    "audio_encoding": {"type": "string", "description": "Audio encoding, default AUDIO_ENCODING_LINEAR_16"},
                    "language_code": {"type": "string", "description": "Language of the utterance"}
                },
                "required": ["audio_file_path"]
            }),
        },
        ToolSpec {
            name: "detect_intent_from_base64",
            description: "Send base64-encoded audio to the agent and return the normalized result, including the recognized transcript.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "audio_base64": {"type": "string", "description": "Base64-encoded audio bytes"},
                    "session_id": {"type": "string", "description": "Conversation id; generated when omitted"},
                    "sample_rate_hertz": {"type": "integer", "description": "Sample rate of the audio, default 16000"},
                    "audio_encoding": {"type": "string", "description": "Audio encoding, default AUDIO_ENCODING_LINEAR_16"},
                    "language_code": {"type": "string", "description": "Language of the utterance"}
                },
                "required": ["audio_base64"]
            }),
        },
        ToolSpec {
            name: "match_intent",
            description: "Classify a text utterance without advancing or persisting dialogue state.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "User text to classify"},
                    "session_id": {"type": "string", "description": "Conversation id; generated when omitted"},
                    "language_code": {"type": "string", "description": "Language of the utterance"}
                },
                "required": ["text"]
            }),
        },
        ToolSpec {
            name: "parse_webhook_request",
            description: "Parse a Dialogflow CX webhook fulfillment request into its session id, intent, parameters, page and messages.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "request_json": {
                        "type": ["object", "string"],
                        "description": "The fulfillment request, as a JSON object or a JSON-encoded string"
                    }
                },
                "required": ["request_json"]
            }),
        },
        ToolSpec {
            name: "create_webhook_response",
            description: "Build the wire payload for a Dialogflow CX webhook fulfillment reply.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fulfillment": {
                        "type": "object",
                        "description": "Reply content: messages (strings, {text} or {payload} objects), parameter_updates, target_page, target_flow",
                        "properties": {
                            "messages": {"type": "array"},
                            "parameter_updates": {"type": "object"},
                            "target_page": {"type": "string"},
                            "target_flow": {"type": "string"}
                        }
                    }
                },
                "required": ["fulfillment"]
            }),
        },
        ToolSpec {
            name: "check_end_interaction",
            description: "Report whether a previously returned detection result signaled the end of the interaction.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "response": {"type": "object", "description": "A detection result returned by detect_intent"}
                },
                "required": ["response"]
            }),
        },
    ]
}

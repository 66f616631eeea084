//! Error types for the Dialogflow CX bridge

use thiserror::Error;

/// Errors that can occur while bridging MCP tool calls to Dialogflow CX
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Agent address or credentials are missing or unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A detection adapter was invoked before `initialize_dialogflow`
    #[error("Dialogflow client not initialized. Call initialize_dialogflow first")]
    Uninitialized,

    /// The remote detect/match call failed; carries the remote diagnostic
    #[error("Intent detection failed: {0}")]
    DetectionFailed(String),

    /// Webhook translation input is missing required structure
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// Utterance or tool-argument validation failed before any remote call
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BridgeError {
    /// Stable kind tag surfaced alongside every failure.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Configuration(_) => "configuration_error",
            BridgeError::Uninitialized => "uninitialized_client",
            BridgeError::DetectionFailed(_) => "detection_failed",
            BridgeError::MalformedPayload(_) => "malformed_payload",
            BridgeError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BridgeError::DetectionFailed("request timed out".to_string())
        } else if err.is_connect() {
            BridgeError::DetectionFailed(format!("connection error: {}", err))
        } else {
            BridgeError::DetectionFailed(err.to_string())
        }
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

//! Session identity: agent addressing and conversation keys.
//!
//! Dialogflow CX addresses everything through resource paths. An agent is
//! `projects/{project}/locations/{location}/agents/{agent}` and a session is
//! that path plus `/sessions/{session_id}`. Ids are caller-supplied or
//! generated; the remote service owns the session itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BridgeError, BridgeResult};

/// Immutable identity of one remote agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAddress {
    pub project_id: String,
    pub location: String,
    pub agent_id: String,
}

impl AgentAddress {
    /// Build an address, rejecting any empty component.
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> BridgeResult<Self> {
        let address = Self {
            project_id: project_id.into(),
            location: location.into(),
            agent_id: agent_id.into(),
        };
        for (field, value) in [
            ("project_id", &address.project_id),
            ("location", &address.location),
            ("agent_id", &address.agent_id),
        ] {
            if value.trim().is_empty() {
                return Err(BridgeError::Configuration(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        Ok(address)
    }

    /// `projects/{project}/locations/{location}/agents/{agent}`
    pub fn agent_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/agents/{}",
            self.project_id, self.location, self.agent_id
        )
    }

    /// Full session resource path for one conversation thread.
    pub fn session_path(&self, session_id: &str) -> String {
        format!("{}/sessions/{}", self.agent_path(), session_id)
    }

    /// Regional API endpoint for this agent's location.
    ///
    /// Regional agents must be called through their regional host; only
    /// `global` agents live on the bare host.
    pub fn default_endpoint(&self) -> String {
        if self.location == "global" {
            "https://dialogflow.googleapis.com/v3".to_string()
        } else {
            format!("https://{}-dialogflow.googleapis.com/v3", self.location)
        }
    }
}

/// Return a non-empty conversation key: the supplied id when present,
/// otherwise a freshly generated UUIDv4.
pub fn resolve_session_id(supplied: Option<&str>) -> String {
    match supplied {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

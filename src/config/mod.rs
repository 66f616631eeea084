use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::dialogflow::ClientOptions;

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub dialogflow: DialogflowSettings,
    #[serde(default)]
    pub webhook: WebhookSettings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Agent binding read from config. All identity fields are optional here;
/// completeness is only required when the binding is actually used, either
/// at startup auto-initialization or via the initialize tool.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DialogflowSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// File containing a bearer token; ambient discovery when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    /// Bound on every outbound Dialogflow call
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Base URL override for the sessions API (tests, proxies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Fulfillment endpoint behavior. Disabled unless turned on in config.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct WebhookSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Static messages returned to every fulfillment call, in order
    #[serde(default)]
    pub reply_messages: Vec<String>,
    /// Echo the inbound session parameters back as updates
    #[serde(default)]
    pub echo_parameters: bool,
}

fn default_language_code() -> String {
    "en-US".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for DialogflowSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            location: None,
            agent_id: None,
            credentials_path: None,
            language_code: default_language_code(),
            timeout_seconds: default_timeout_seconds(),
            endpoint: None,
        }
    }
}

impl DialogflowSettings {
    /// The (project, location, agent) triple when all three are configured.
    pub fn configured_address(&self) -> Option<(String, String, String)> {
        match (&self.project_id, &self.location, &self.agent_id) {
            (Some(project), Some(location), Some(agent)) => {
                Some((project.clone(), location.clone(), agent.clone()))
            }
            _ => None,
        }
    }

    /// Client options derived from this section.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            credentials_path: self.credentials_path.clone(),
            language_code: self.language_code.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
            endpoint: self.endpoint.clone(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(PathBuf::from("peitho.toml")).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let config_path = &cli.config;

        // Build config from file
        let s = Config::builder()
            .add_source(File::from(config_path.clone()).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;

        // Apply CLI overrides (CLI > env vars > config file)
        settings.apply_cli_overrides(cli);

        Ok(settings)
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        // Server overrides
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }

        // Agent binding overrides, applied only when any agent flag is set
        if cli.has_agent_config() {
            if let Some(project_id) = &cli.project_id {
                self.dialogflow.project_id = Some(project_id.clone());
            }
            if let Some(location) = &cli.location {
                self.dialogflow.location = Some(location.clone());
            }
            if let Some(agent_id) = &cli.agent_id {
                self.dialogflow.agent_id = Some(agent_id.clone());
            }
            if let Some(credentials) = &cli.credentials {
                self.dialogflow.credentials_path = Some(credentials.clone());
            }
        }
    }
}

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Peitho - Dialogflow CX sessions as MCP tools
#[derive(Parser, Debug, Clone)]
#[command(name = "peitho", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "PEITHO_CONFIG", default_value = "peitho.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "PEITHO_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "PEITHO_PORT")]
    pub port: Option<u16>,

    /// MCP transport to serve
    #[arg(long, env = "PEITHO_TRANSPORT", value_enum, default_value_t = Transport::Http)]
    pub transport: Transport,

    /// Google Cloud project id of the agent
    #[arg(long, env = "DIALOGFLOW_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Agent location: a region such as "us-central1", or "global"
    #[arg(long, env = "DIALOGFLOW_LOCATION")]
    pub location: Option<String>,

    /// Dialogflow CX agent id
    #[arg(long, env = "DIALOGFLOW_AGENT_ID")]
    pub agent_id: Option<String>,

    /// Path to a file containing a bearer token for the Dialogflow API
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,
}

/// How the MCP surface is exposed.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Streamable HTTP under /mcp, plus health and webhook routes
    Http,
    /// stdio for MCP hosts that spawn the process; logs go to stderr
    Stdio,
}

impl Cli {
    /// Check if any agent binding field is provided via CLI or environment
    pub fn has_agent_config(&self) -> bool {
        self.project_id.is_some()
            || self.location.is_some()
            || self.agent_id.is_some()
            || self.credentials.is_some()
    }
}

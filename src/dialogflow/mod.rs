//! Dialogflow CX client surfaces
//!
//! Everything that speaks the remote service's dialect lives here:
//!
//! - `session` - Agent addressing and session id resolution
//! - `client` - Sessions REST client (detectIntent / matchIntent)
//! - `types` - Wire-format response structs
//! - `webhook` - Fulfillment request/response translation
//!
//! The rest of the crate only ever sees the normalized shapes from
//! [`crate::domain`]; the wire schema does not leak past this module.

pub mod client;
pub mod session;
pub mod types;
pub mod webhook;

// Re-export commonly used types
pub use client::{ClientOptions, SessionsClient, ACCESS_TOKEN_ENV, TOKEN_FILE_ENV};
pub use session::{resolve_session_id, AgentAddress};

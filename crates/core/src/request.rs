//! The transport-agnostic request contract.
//!
//! ```json
//! {
//!   "assistant_id": "dental_agent",
//!   "input": { "messages": [{ "role": "user", "content": "..." }] },
//!   "metadata": { "x_auth": "Bearer ...", "llm_provider": "gemini", "llm_tier": "pro" }
//! }
//! ```

use crate::error::{Error, Result};
use crate::message::{Message, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// Which agent configuration to run (e.g. "react", "dental_agent").
    pub assistant_id: String,

    #[serde(default)]
    pub input: RunInput,

    #[serde(default)]
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInput {
    #[serde(default)]
    pub messages: Vec<InputMessage>,
}

/// A role/content pair from the caller.
///
/// `content` is either a plain string or a list of content parts
/// (`[{"type": "text", "text": "..."}]`); only text parts are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputMessage {
    pub role: String,
    pub content: serde_json::Value,
}

impl InputMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: serde_json::Value::String(content.into()),
        }
    }

    /// Flatten the content into text.
    pub fn text(&self) -> String {
        match &self.content {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    serde_json::Value::String(s) => Some(s.as_str()),
                    other => other["text"].as_str(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl RunInput {
    /// Convert the caller's messages into seed conversation messages.
    ///
    /// Tool messages cannot be seeded because they would answer calls the
    /// conversation never issued.
    pub fn to_messages(&self) -> Result<Vec<Message>> {
        if self.messages.is_empty() {
            return Err(Error::InvalidRequest("input.messages is empty".into()));
        }
        self.messages
            .iter()
            .map(|m| match Role::parse(&m.role) {
                Some(Role::User) => Ok(Message::user(m.text())),
                Some(Role::Assistant) => Ok(Message::assistant(m.text())),
                Some(Role::System) => Ok(Message::system(m.text())),
                Some(Role::Tool) => Err(Error::InvalidRequest(
                    "tool messages cannot be part of the seed conversation".into(),
                )),
                None => Err(Error::InvalidRequest(format!("unknown role '{}'", m.role))),
            })
            .collect()
    }
}

/// Recognized request metadata keys. Unrecognized keys land in `extra`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Bearer credential (`"Bearer <token>"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_auth: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_tier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_thinking: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl std::fmt::Debug for RequestMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestMetadata")
            .field("x_auth", &self.x_auth.as_ref().map(|_| "[REDACTED]"))
            .field("opened_file_path", &self.opened_file_path)
            .field("workspace_path", &self.workspace_path)
            .field("user_id", &self.user_id)
            .field("tenant_id", &self.tenant_id)
            .field("llm_provider", &self.llm_provider)
            .field("llm_tier", &self.llm_tier)
            .field("llm_model", &self.llm_model)
            .field("enable_thinking", &self.enable_thinking)
            .field("thinking_budget", &self.thinking_budget)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

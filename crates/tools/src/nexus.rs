//! Nexus server client: remote filesystem, memory store and skills.
//!
//! Every call carries the caller's bearer credential from the
//! [`AuthContext`]; the client itself holds no per-user state.

use async_trait::async_trait;
use nexagent_core::auth::AuthContext;
use nexagent_core::error::ToolError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One grep hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrepMatch {
    pub file: String,
    pub line: u64,
    pub content: String,
}

/// One stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    #[serde(default)]
    pub memory_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A skill registered on the Nexus server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GrepRequest {
    pub pattern: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
    pub ignore_case: bool,
}

/// JSON-RPC access to a Nexus server.
///
/// Implementors provide [`call`](NexusClient::call); the typed operations
/// are expressed on top of it.
#[async_trait]
pub trait NexusClient: Send + Sync {
    /// Invoke `method` with `params` on behalf of the caller.
    async fn call(
        &self,
        auth: &AuthContext,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;

    /// The server URL exported into sandboxes.
    fn server_url(&self) -> &str;

    async fn read(&self, auth: &AuthContext, path: &str) -> Result<String, ToolError> {
        let value = self
            .call(auth, "read", serde_json::json!({ "path": path }))
            .await?;
        Ok(match value {
            serde_json::Value::String(s) => s,
            other => other["content"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn write(&self, auth: &AuthContext, path: &str, content: &str) -> Result<u64, ToolError> {
        let value = self
            .call(
                auth,
                "write",
                serde_json::json!({ "path": path, "content": content }),
            )
            .await?;
        Ok(value["bytes_written"]
            .as_u64()
            .unwrap_or(content.len() as u64))
    }

    async fn grep(&self, auth: &AuthContext, request: &GrepRequest) -> Result<Vec<GrepMatch>, ToolError> {
        let value = self
            .call(auth, "grep", serde_json::to_value(request).unwrap_or_default())
            .await?;
        decode_list(value, "matches", "grep")
    }

    async fn glob(&self, auth: &AuthContext, pattern: &str, path: &str) -> Result<Vec<String>, ToolError> {
        let value = self
            .call(
                auth,
                "glob",
                serde_json::json!({ "pattern": pattern, "path": path }),
            )
            .await?;
        decode_list(value, "files", "glob")
    }

    async fn query_memories(
        &self,
        auth: &AuthContext,
        query: Option<&str>,
        limit: u32,
    ) -> Result<Vec<MemoryRecord>, ToolError> {
        let value = self
            .call(
                auth,
                "query_memories",
                serde_json::json!({ "query": query, "limit": limit }),
            )
            .await?;
        decode_list(value, "memories", "query_memories")
    }

    async fn list_skills(&self, auth: &AuthContext) -> Result<Vec<Skill>, ToolError> {
        let value = self
            .call(auth, "list_skills", serde_json::json!({ "tier": "all" }))
            .await?;
        decode_list(value, "skills", "list_skills")
    }
}

/// Accept either a bare list or `{ <key>: [...] }`.
fn decode_list<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    key: &str,
    operation: &str,
) -> Result<Vec<T>, ToolError> {
    let list = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Null => return Ok(Vec::new()),
        mut other => other[key].take(),
    };
    if list.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(list).map_err(|e| ToolError::Remote {
        operation: operation.into(),
        reason: format!("unexpected response shape: {e}"),
    })
}

/// HTTP JSON-RPC client for a Nexus server.
pub struct HttpNexusClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpNexusClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &nexagent_config::NexusConfig) -> Self {
        Self::new(&config.url, Duration::from_secs(config.timeout_secs))
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    message: String,
}

#[async_trait]
impl NexusClient for HttpNexusClient {
    async fn call(
        &self,
        auth: &AuthContext,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let url = format!("{}/api/nfs/{method}", self.base_url);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": uuid::Uuid::new_v4().to_string(),
            "method": method,
            "params": params,
        });

        debug!(%method, caller = %auth.fingerprint(), "Nexus call");

        let mut request = self.client.post(&url).json(&body);
        if let Some(header) = auth.authorization_header() {
            request = request.header("Authorization", header);
        }

        let remote = |reason: String| ToolError::Remote {
            operation: method.to_string(),
            reason,
        };

        let response = request.send().await.map_err(|e| remote(e.to_string()))?;
        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(ToolError::PermissionDenied {
                tool_name: method.to_string(),
                reason: "Nexus rejected the credential".into(),
            });
        }
        if !(200..300).contains(&status) {
            let text = response.text().await.unwrap_or_default();
            return Err(remote(format!("HTTP {status}: {text}")));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| remote(format!("invalid response: {e}")))?;
        if let Some(err) = rpc.error {
            return Err(remote(format!("{} (code {})", err.message, err.code)));
        }
        Ok(rpc.result.unwrap_or(serde_json::Value::Null))
    }

    fn server_url(&self) -> &str {
        &self.base_url
    }
}

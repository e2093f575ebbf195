//! Memory query tool. Reads the caller's stored memories from Nexus.

use crate::nexus::NexusClient;
use async_trait::async_trait;
use nexagent_core::auth::AuthContext;
use nexagent_core::error::ToolError;
use nexagent_core::schema::{ArgKind, ArgumentSchema};
use nexagent_core::tool::{Tool, ToolResult};
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

pub struct QueryMemoriesTool {
    nexus: Arc<dyn NexusClient>,
}

impl QueryMemoriesTool {
    pub fn new(nexus: Arc<dyn NexusClient>) -> Self {
        Self { nexus }
    }
}

#[async_trait]
impl Tool for QueryMemoriesTool {
    fn name(&self) -> &str {
        "query_memories"
    }

    fn description(&self) -> &str {
        "Query stored memories for the current user. Without a query, returns the most recent memories."
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new()
            .optional("query", ArgKind::String, "Text to match against memories")
            .optional("limit", ArgKind::Integer, "Maximum memories to return (default 20)")
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        let query = arguments["query"].as_str().filter(|q| !q.trim().is_empty());
        let limit = arguments["limit"]
            .as_u64()
            .map(|n| n.clamp(1, MAX_LIMIT as u64) as u32)
            .unwrap_or(DEFAULT_LIMIT);

        let memories = self.nexus.query_memories(auth, query, limit).await?;
        if memories.is_empty() {
            return Ok(ToolResult::success("No memories found."));
        }

        let lines: Vec<String> = memories
            .iter()
            .enumerate()
            .map(|(i, m)| match &m.memory_type {
                Some(kind) => format!("{}. [{kind}] {}", i + 1, m.content),
                None => format!("{}. {}", i + 1, m.content),
            })
            .collect();

        Ok(ToolResult::success(lines.join("\n"))
            .with_data(serde_json::json!({ "count": memories.len() })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryNexus;
    use crate::nexus::MemoryRecord;

    #[tokio::test]
    async fn lists_memories() {
        let nexus = MemoryNexus {
            memories: vec![
                MemoryRecord {
                    memory_id: "m1".into(),
                    content: "Prefers metric units".into(),
                    memory_type: Some("preference".into()),
                    created_at: None,
                },
                MemoryRecord {
                    memory_id: "m2".into(),
                    content: "Works on the billing service".into(),
                    memory_type: None,
                    created_at: None,
                },
            ],
            ..Default::default()
        };
        let tool = QueryMemoriesTool::new(Arc::new(nexus));
        let result = tool
            .execute(serde_json::json!({}), &AuthContext::anonymous())
            .await
            .unwrap();
        assert_eq!(
            result.output,
            "1. [preference] Prefers metric units\n2. Works on the billing service"
        );
    }

    #[tokio::test]
    async fn empty_store() {
        let tool = QueryMemoriesTool::new(Arc::new(MemoryNexus::default()));
        let result = tool
            .execute(serde_json::json!({"query": "x", "limit": 5}), &AuthContext::anonymous())
            .await
            .unwrap();
        assert_eq!(result.output, "No memories found.");
    }
}

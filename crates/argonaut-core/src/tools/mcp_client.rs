//! MCP client contract and a mock implementation for tests.
//!
//! The trait is the seam between the agent and whatever process exposes the
//! tools; the production implementation lives in `rmcp_client`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::AgentError;

#[derive(Debug, Clone)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[async_trait]
pub trait McpClient: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, AgentError>;
    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<String, AgentError>;
    async fn is_connected(&self) -> bool;
}

// Mock implementation for testing
pub struct MockMcpClient {
    connected: bool,
}

impl MockMcpClient {
    pub fn new() -> Self {
        Self { connected: true }
    }

    pub fn with_connection_status(connected: bool) -> Self {
        Self { connected }
    }
}

impl Default for MockMcpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpClient for MockMcpClient {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, AgentError> {
        if !self.connected {
            return Err(AgentError::MCPError("Not connected".to_string()));
        }

        Ok(vec![
            McpToolInfo {
                name: "mock_tool_1".to_string(),
                description: "First mock tool".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "input": { "type": "string", "description": "Input parameter" }
                    },
                    "required": ["input"]
                }),
            },
            McpToolInfo {
                name: "mock_tool_2".to_string(),
                description: "Second mock tool".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "value": { "type": "number", "description": "Numeric value" }
                    },
                    "required": ["value"]
                }),
            },
        ])
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<String, AgentError> {
        if !self.connected {
            return Err(AgentError::MCPError("Not connected".to_string()));
        }

        Ok(format!(
            "Mock result from {} with arguments: {}",
            tool_name, arguments
        ))
    }

    async fn is_connected(&self) -> bool {
        self.connected
    }
}

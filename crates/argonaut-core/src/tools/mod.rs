//! Tool abstractions for the agent loop.
//!
//! Tools are not compiled into the agent: they are discovered at runtime
//! from an MCP server and wrapped behind the `Tool` trait, so the loop only
//! ever sees a uniform capability list.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AgentError;
use crate::llm::ToolMetadata;

pub mod mcp_client;
pub mod rmcp_client;

pub use mcp_client::{McpClient, McpToolInfo, MockMcpClient};
pub use rmcp_client::RmcpClient;

#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;
    async fn execute(&self, arguments: Value) -> Result<String, AgentError>;
}

/// A remotely discovered MCP tool exposed to the agent.
pub struct McpTool {
    client: Arc<dyn McpClient>,
    info: McpToolInfo,
}

impl McpTool {
    pub fn new(client: Arc<dyn McpClient>, info: McpToolInfo) -> Self {
        Self { client, info }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: self.info.name.clone(),
            description: self.info.description.clone(),
            input_schema: self.info.input_schema.clone(),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, AgentError> {
        self.client
            .call_tool(&self.info.name, arguments)
            .await
            .map_err(|e| AgentError::ToolError {
                tool_name: self.info.name.clone(),
                message: format!("MCP tool execution failed: {}", e),
            })
    }
}

/// Discovers the server's tool set and wraps each tool for the agent.
pub async fn discover_tools(
    client: Arc<dyn McpClient>,
) -> Result<Vec<Arc<dyn Tool>>, AgentError> {
    let infos = client.list_tools().await.map_err(|e| AgentError::ToolError {
        tool_name: "mcp_discovery".to_string(),
        message: format!("Failed to discover MCP tools: {}", e),
    })?;

    log::debug!("Discovered {} tools from MCP server", infos.len());

    Ok(infos
        .into_iter()
        .map(|info| Arc::new(McpTool::new(client.clone(), info)) as Arc<dyn Tool>)
        .collect())
}

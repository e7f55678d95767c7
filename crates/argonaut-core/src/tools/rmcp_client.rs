//! MCP client over a child-process stdio transport.
//!
//! Spawns the configured tool server (by default the bundled `argonaut-mcp`
//! binary), completes the MCP handshake and exposes tool listing and
//! invocation. The capability set is whatever the server reports at
//! connection time.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, RawContent, ResourceContents},
    service::{DynService, RunningService, ServiceExt},
    transport::TokioChildProcess,
    RoleClient,
};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::RwLock;

use super::mcp_client::{McpClient, McpToolInfo};
use crate::config::McpCommand;
use crate::errors::AgentError;

const LIST_TOOLS_TIMEOUT_SECS: u64 = 30;

pub struct RmcpClient {
    service: Option<RunningService<RoleClient, Box<dyn DynService<RoleClient>>>>,
    connected: Arc<RwLock<bool>>,
}

impl RmcpClient {
    pub async fn spawn(mcp_command: &McpCommand) -> Result<Self, AgentError> {
        log::info!(
            "Starting MCP tool server: {} {:?}",
            mcp_command.run,
            mcp_command.args
        );

        let mut cmd = Command::new(&mcp_command.run);
        cmd.args(&mcp_command.args);
        for (key, value) in &mcp_command.env {
            cmd.env(key, value);
        }

        let transport = TokioChildProcess::new(cmd)
            .map_err(|e| AgentError::MCPError(format!("Failed to create transport: {}", e)))?;

        let service_handler: Box<dyn DynService<RoleClient>> = Box::new(());
        let service = service_handler.serve(transport).await.map_err(|e| {
            log::error!("MCP initialize failed: {}", e);
            AgentError::MCPError(format!("Failed to create service: {}", e))
        })?;

        log::info!("Connected to MCP server: {:?}", service.peer_info());

        Ok(Self {
            service: Some(service),
            connected: Arc::new(RwLock::new(true)),
        })
    }

    pub async fn disconnect(&mut self) -> Result<(), AgentError> {
        if let Some(service) = self.service.take() {
            service
                .cancel()
                .await
                .map_err(|e| AgentError::MCPError(format!("Failed to cancel service: {}", e)))?;
        }
        *self.connected.write().await = false;
        log::info!("Disconnected from MCP server");
        Ok(())
    }

    fn flatten_content(content: &[rmcp::model::Content]) -> String {
        if content.is_empty() {
            return "Tool executed successfully (no content returned)".to_string();
        }

        let mut full_text = String::new();
        for c in content {
            let text = match &c.raw {
                RawContent::Text(text_content) => text_content.text.clone(),
                RawContent::Image(image_content) => format!(
                    "Image ({}, {} bytes)",
                    image_content.mime_type,
                    image_content.data.len()
                ),
                RawContent::Resource(resource_content) => match &resource_content.resource {
                    ResourceContents::TextResourceContents { uri, .. } => {
                        format!("Resource: {}", uri)
                    }
                    ResourceContents::BlobResourceContents { uri, .. } => {
                        format!("Resource: {}", uri)
                    }
                },
                RawContent::Audio(audio_content) => format!(
                    "Audio ({}, {} bytes)",
                    audio_content.mime_type,
                    audio_content.data.len()
                ),
            };
            full_text.push_str(&text);
            full_text.push('\n');
        }
        full_text
    }
}

fn convert_tool(tool: &rmcp::model::Tool) -> McpToolInfo {
    McpToolInfo {
        name: tool.name.to_string(),
        description: tool
            .description
            .as_ref()
            .map(|d| d.as_ref())
            .unwrap_or("")
            .to_string(),
        input_schema: Value::Object(tool.input_schema.as_ref().clone()),
    }
}

#[async_trait]
impl McpClient for RmcpClient {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, AgentError> {
        if !*self.connected.read().await {
            return Err(AgentError::MCPError("Not connected".to_string()));
        }

        let service = self
            .service
            .as_ref()
            .ok_or_else(|| AgentError::MCPError("Service not available".to_string()))?;

        let tools_response = tokio::time::timeout(
            std::time::Duration::from_secs(LIST_TOOLS_TIMEOUT_SECS),
            service.list_tools(Default::default()),
        )
        .await
        .map_err(|_| {
            AgentError::MCPError("Timeout waiting for list_tools response".to_string())
        })?
        .map_err(|e| AgentError::MCPError(format!("Failed to list tools: {}", e)))?;

        log::debug!("Listed {} tools from MCP server", tools_response.tools.len());
        Ok(tools_response.tools.iter().map(convert_tool).collect())
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<String, AgentError> {
        if !*self.connected.read().await {
            return Err(AgentError::MCPError("Not connected".to_string()));
        }

        let service = self
            .service
            .as_ref()
            .ok_or_else(|| AgentError::MCPError("Service not available".to_string()))?;

        let arguments = if arguments.is_null() {
            None
        } else {
            arguments.as_object().cloned()
        };

        let request = CallToolRequestParam {
            name: tool_name.to_string().into(),
            arguments,
        };

        let result = service.call_tool(request).await.map_err(|e| {
            AgentError::MCPError(format!("Failed to call tool '{}': {}", tool_name, e))
        })?;

        log::debug!("Tool '{}' executed", tool_name);
        Ok(Self::flatten_content(&result.content))
    }

    async fn is_connected(&self) -> bool {
        *self.connected.read().await && self.service.is_some()
    }
}

impl Drop for RmcpClient {
    fn drop(&mut self) {
        if let Some(service) = self.service.take() {
            // Cannot await in Drop; detach the cancellation.
            tokio::spawn(async move {
                if let Err(e) = service.cancel().await {
                    log::warn!("Failed to cancel MCP service during drop: {}", e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::borrow::Cow;

    #[test]
    fn test_tool_conversion() {
        let rmcp_tool = rmcp::model::Tool {
            name: Cow::from("argocd_app_list"),
            description: Some(Cow::from("List applications")),
            input_schema: Arc::new(
                json!({
                    "type": "object",
                    "properties": {
                        "project": { "type": "string" }
                    }
                })
                .as_object()
                .unwrap()
                .clone(),
            ),
            annotations: None,
        };

        let info = convert_tool(&rmcp_tool);
        assert_eq!(info.name, "argocd_app_list");
        assert_eq!(info.description, "List applications");
        assert_eq!(info.input_schema["type"], "object");
    }

    #[test]
    fn test_flatten_content_empty() {
        let flattened = RmcpClient::flatten_content(&[]);
        assert!(flattened.contains("no content returned"));
    }
}

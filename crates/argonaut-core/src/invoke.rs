//! Agent invocation: one conversation state in, one updated state out.
//!
//! `invoke` wires the production pieces together (LLM from configuration,
//! tool server spawned as a child process, tools discovered at runtime);
//! `invoke_with` is the same flow with the LLM and MCP client supplied by
//! the caller, which is also the testing seam.

use std::sync::Arc;

use crate::agent::{AgentConfig, ReactAgent};
use crate::config::RuntimeConfig;
use crate::core_types::Message;
use crate::errors::AgentError;
use crate::llm::{providers, LLM};
use crate::state::{AgentState, ChatMessage, MsgType, OutputState};
use crate::tools::{discover_tools, McpClient, RmcpClient};

const SYSTEM_PROMPT: &str = "You are an ArgoCD operations assistant. You manage GitOps application \
deployments through the available tools: list, inspect, create, update, delete and sync \
applications. Use the tools to answer the user's request and report the outcome clearly. \
Never invent application state you have not observed through a tool.";

/// Runs the agent for one request using the process configuration.
pub async fn invoke(state: AgentState, config: &RuntimeConfig) -> Result<AgentState, AgentError> {
    let llm = providers::create_llm_client(&config.llm)?;
    let mcp_client: Arc<dyn McpClient> = Arc::new(RmcpClient::spawn(&config.mcp).await?);
    invoke_with(state, llm, mcp_client).await
}

/// Runs the agent for one request with explicit dependencies.
pub async fn invoke_with(
    state: AgentState,
    llm: Arc<dyn LLM>,
    mcp_client: Arc<dyn McpClient>,
) -> Result<AgentState, AgentError> {
    let tools = discover_tools(mcp_client).await?;
    log::info!("Invoking agent with {} discovered tools", tools.len());

    let agent = ReactAgent::new(
        llm,
        tools,
        AgentConfig {
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            ..Default::default()
        },
    );

    let input_messages: Vec<Message> = state
        .input
        .messages
        .iter()
        .map(|message| match message.msg_type {
            MsgType::Human => Message::user(message.content.clone()),
            MsgType::Assistant => Message::assistant(message.content.clone()),
        })
        .collect();

    let replies = agent.run(input_messages).await?;

    // Every reply surfaces as an assistant message; tool plumbing with empty
    // content is dropped.
    let output_messages: Vec<ChatMessage> = replies
        .into_iter()
        .filter(|message| !message.content.is_empty())
        .map(|message| ChatMessage::assistant(message.content))
        .collect();

    Ok(AgentState {
        input: state.input,
        output: Some(OutputState {
            messages: output_messages,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::LLMResponse;
    use crate::llm::ToolMetadata;
    use crate::tools::MockMcpClient;
    use async_trait::async_trait;

    /// Tool-agent stand-in that replies with a fixed assistant message.
    struct CannedLlm {
        reply: String,
    }

    #[async_trait]
    impl LLM for CannedLlm {
        async fn generate(
            &self,
            _messages: Vec<Message>,
            _tools: Option<Vec<ToolMetadata>>,
        ) -> Result<LLMResponse, AgentError> {
            Ok(LLMResponse {
                content: Some(self.reply.clone()),
                tool_calls: None,
                finish_reason: Some("stop".to_string()),
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn test_invoke_produces_single_assistant_reply() {
        let state = AgentState::from_messages(vec![ChatMessage::human("sync app test-app")]);
        let llm = Arc::new(CannedLlm {
            reply: "Sync completed successfully".to_string(),
        });
        let mcp_client: Arc<dyn McpClient> = Arc::new(MockMcpClient::new());

        let result = invoke_with(state, llm, mcp_client).await.unwrap();

        let output = result.output.expect("output state must be set");
        assert_eq!(output.messages.len(), 1);
        assert_eq!(output.messages[0].msg_type, MsgType::Assistant);
        assert_eq!(output.messages[0].content, "Sync completed successfully");
        // The input state rides along unchanged.
        assert_eq!(result.input.messages[0].content, "sync app test-app");
    }

    #[tokio::test]
    async fn test_invoke_fails_when_discovery_fails() {
        let state = AgentState::from_messages(vec![ChatMessage::human("list apps")]);
        let llm = Arc::new(CannedLlm {
            reply: "unreachable".to_string(),
        });
        let mcp_client: Arc<dyn McpClient> =
            Arc::new(MockMcpClient::with_connection_status(false));

        assert!(invoke_with(state, llm, mcp_client).await.is_err());
    }
}

//! OpenAI chat-completions client.
//!
//! Also serves any OpenAI-compatible endpoint through the `api_base`
//! override in the configuration.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::core_types::{LLMResponse, Message, Role, ToolCall, Usage};
use crate::errors::AgentError;
use crate::llm::{ToolMetadata, LLM};

const OPENAI_API_BASE: &str = "https://api.openai.com";

pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: ChatFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    /// JSON-encoded arguments, per the chat-completions wire format.
    arguments: String,
}

#[derive(Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ChatFunctionSpec,
}

#[derive(Serialize)]
struct ChatFunctionSpec {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn api_base(&self) -> &str {
        self.config.api_base.as_deref().unwrap_or(OPENAI_API_BASE)
    }

    fn convert_messages(&self, messages: Vec<Message>) -> Vec<ChatMessage> {
        messages
            .into_iter()
            .map(|message| {
                let role = match message.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };
                let tool_calls = message.tool_calls.map(|calls| {
                    calls
                        .into_iter()
                        .enumerate()
                        .map(|(i, call)| ChatToolCall {
                            id: call.id.unwrap_or_else(|| format!("call_{}", i)),
                            call_type: "function".to_string(),
                            function: ChatFunctionCall {
                                name: call.name,
                                arguments: call.arguments.to_string(),
                            },
                        })
                        .collect()
                });
                ChatMessage {
                    role,
                    content: message.content,
                    tool_call_id: message.tool_call_id,
                    tool_calls,
                }
            })
            .collect()
    }

    fn convert_tools(&self, tools: Option<Vec<ToolMetadata>>) -> Vec<ChatTool> {
        tools
            .unwrap_or_default()
            .into_iter()
            .map(|tool| ChatTool {
                tool_type: "function",
                function: ChatFunctionSpec {
                    name: tool.name,
                    description: tool.description,
                    parameters: tool.input_schema,
                },
            })
            .collect()
    }

    fn convert_response(&self, response: ChatResponse) -> Result<LLMResponse, AgentError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::LLMError("OpenAI response had no choices".to_string()))?;

        let tool_calls = match choice.message.tool_calls {
            Some(calls) if !calls.is_empty() => {
                let mut converted = Vec::with_capacity(calls.len());
                for call in calls {
                    let arguments: Value =
                        serde_json::from_str(&call.function.arguments).map_err(|e| {
                            AgentError::ParsingError(format!(
                                "Invalid tool call arguments for '{}': {}",
                                call.function.name, e
                            ))
                        })?;
                    converted.push(ToolCall {
                        id: Some(call.id),
                        name: call.function.name,
                        arguments,
                    });
                }
                Some(converted)
            }
            _ => None,
        };

        Ok(LLMResponse {
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls,
            finish_reason: choice.finish_reason,
            usage: response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl LLM for OpenAiClient {
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(messages),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            tools: self.convert_tools(tools),
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base()))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<Value>(&error_text)
                .ok()
                .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(String::from))
                .unwrap_or(error_text);
            return Err(AgentError::LLMError(format!(
                "OpenAI API error ({}): {}",
                status, detail
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::LLMError(format!("Failed to parse response: {}", e)))?;

        self.convert_response(chat_response)
    }
}

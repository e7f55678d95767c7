//! Anthropic Claude messages-API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::core_types::{LLMResponse, Message, Role, ToolCall, Usage};
use crate::errors::AgentError;
use crate::llm::{ToolMetadata, LLM};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: Client,
    config: LlmConfig,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum AnthropicContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseContent>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum AnthropicResponseContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicError {
    message: String,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn api_base(&self) -> &str {
        self.config.api_base.as_deref().unwrap_or(ANTHROPIC_API_BASE)
    }

    /// Splits off the system prompt and folds the remaining messages into
    /// Anthropic's alternating user/assistant blocks. Tool results ride in
    /// user turns, tool calls in assistant turns.
    fn convert_messages(
        &self,
        messages: Vec<Message>,
    ) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system = None;
        let mut converted: Vec<AnthropicMessage> = Vec::new();
        let mut user_content: Vec<AnthropicContent> = Vec::new();
        let mut assistant_content: Vec<AnthropicContent> = Vec::new();

        fn flush(
            converted: &mut Vec<AnthropicMessage>,
            role: &'static str,
            content: &mut Vec<AnthropicContent>,
        ) {
            if !content.is_empty() {
                converted.push(AnthropicMessage {
                    role,
                    content: content.drain(..).collect(),
                });
            }
        }

        for message in messages {
            match message.role {
                Role::System => system = Some(message.content),
                Role::User => {
                    flush(&mut converted, "assistant", &mut assistant_content);
                    user_content.push(AnthropicContent::Text {
                        text: message.content,
                    });
                }
                Role::Assistant => {
                    flush(&mut converted, "user", &mut user_content);
                    if !message.content.is_empty() {
                        assistant_content.push(AnthropicContent::Text {
                            text: message.content,
                        });
                    }
                    for (i, call) in message.tool_calls.unwrap_or_default().into_iter().enumerate()
                    {
                        assistant_content.push(AnthropicContent::ToolUse {
                            id: call.id.unwrap_or_else(|| format!("call_{}", i)),
                            name: call.name,
                            input: call.arguments,
                        });
                    }
                }
                Role::Tool => {
                    flush(&mut converted, "assistant", &mut assistant_content);
                    user_content.push(AnthropicContent::ToolResult {
                        tool_use_id: message.tool_call_id.unwrap_or_default(),
                        content: message.content,
                    });
                }
            }
        }
        flush(&mut converted, "user", &mut user_content);
        flush(&mut converted, "assistant", &mut assistant_content);

        (system, converted)
    }

    fn convert_response(&self, response: AnthropicResponse) -> LLMResponse {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                AnthropicResponseContent::Text { text } => content.push_str(&text),
                AnthropicResponseContent::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall {
                        id: Some(id),
                        name,
                        arguments: input,
                    });
                }
            }
        }

        LLMResponse {
            content: (!content.is_empty()).then_some(content),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            finish_reason: response.stop_reason,
            usage: Some(Usage {
                prompt_tokens: response.usage.input_tokens,
                completion_tokens: response.usage.output_tokens,
                total_tokens: response.usage.input_tokens + response.usage.output_tokens,
            }),
        }
    }
}

#[async_trait]
impl LLM for AnthropicClient {
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError> {
        let (system, anthropic_messages) = self.convert_messages(messages);

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: anthropic_messages,
            system,
            temperature: (self.config.temperature > 0.0).then_some(self.config.temperature),
            tools: tools
                .unwrap_or_default()
                .into_iter()
                .map(|tool| AnthropicTool {
                    name: tool.name,
                    description: tool.description,
                    input_schema: tool.input_schema,
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base()))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
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
            if let Ok(error) = serde_json::from_str::<AnthropicError>(&error_text) {
                return Err(AgentError::LLMError(format!(
                    "Anthropic API error ({}): {}",
                    status, error.message
                )));
            }
            return Err(AgentError::LLMError(format!(
                "HTTP {} error: {}",
                status, error_text
            )));
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AgentError::LLMError(format!("Failed to parse response: {}", e)))?;

        Ok(self.convert_response(anthropic_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use serde_json::json;

    fn test_client() -> AnthropicClient {
        AnthropicClient::new(LlmConfig {
            provider: LlmProvider::Anthropic,
            model: "claude-3-5-sonnet-latest".to_string(),
            api_key: "test-key".to_string(),
            api_base: None,
            temperature: 0.0,
            max_tokens: 1024,
        })
    }

    #[test]
    fn test_system_message_is_lifted_out() {
        let client = test_client();
        let (system, messages) = client.convert_messages(vec![
            Message::system("You manage ArgoCD"),
            Message::user("list apps"),
        ]);
        assert_eq!(system.as_deref(), Some("You manage ArgoCD"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_tool_result_rides_in_user_turn() {
        let client = test_client();
        let (_, messages) = client.convert_messages(vec![
            Message::user("sync test-app"),
            Message {
                role: Role::Assistant,
                content: String::new(),
                tool_call_id: None,
                tool_calls: Some(vec![ToolCall {
                    id: Some("toolu_1".to_string()),
                    name: "argocd_app_sync".to_string(),
                    arguments: json!({"name": "test-app"}),
                }]),
            },
            Message {
                role: Role::Tool,
                content: r#"{"status":"sync_initiated"}"#.to_string(),
                tool_call_id: Some("toolu_1".to_string()),
                tool_calls: None,
            },
        ]);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].role, "user");
    }

    #[test]
    fn test_response_conversion_collects_tool_calls() {
        let client = test_client();
        let response = AnthropicResponse {
            content: vec![
                AnthropicResponseContent::Text {
                    text: "Syncing now.".to_string(),
                },
                AnthropicResponseContent::ToolUse {
                    id: "toolu_1".to_string(),
                    name: "argocd_app_sync".to_string(),
                    input: json!({"name": "test-app"}),
                },
            ],
            stop_reason: Some("tool_use".to_string()),
            usage: AnthropicUsage {
                input_tokens: 10,
                output_tokens: 5,
            },
        };
        let converted = client.convert_response(response);
        assert_eq!(converted.content.as_deref(), Some("Syncing now."));
        assert_eq!(converted.tool_calls.unwrap()[0].name, "argocd_app_sync");
        assert_eq!(converted.usage.unwrap().total_tokens, 15);
    }
}

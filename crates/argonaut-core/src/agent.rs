//! React-style tool-calling loop.
//!
//! The loop sends the transcript and the discovered tool metadata to the LLM,
//! executes whatever tool calls come back, feeds the observations in as tool
//! messages and repeats until the model answers without calling a tool. A
//! single invocation is one bounded round-trip: no retries, no cancellation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core_types::{Message, Role};
use crate::errors::AgentError;
use crate::llm::{ToolMetadata, LLM};
use crate::tools::Tool;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_steps: usize,
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            system_prompt: None,
        }
    }
}

pub struct ReactAgent {
    llm: Arc<dyn LLM>,
    tools: HashMap<String, Arc<dyn Tool>>,
    config: AgentConfig,
}

impl ReactAgent {
    pub fn new(llm: Arc<dyn LLM>, tools: Vec<Arc<dyn Tool>>, config: AgentConfig) -> Self {
        let tools = tools
            .into_iter()
            .map(|tool| (tool.metadata().name.clone(), tool))
            .collect();
        Self { llm, tools, config }
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Runs the loop over `input` and returns the messages produced by the
    /// run, in order: assistant turns (with their tool calls) interleaved
    /// with tool observations, ending in the final assistant reply.
    pub async fn run(&self, input: Vec<Message>) -> Result<Vec<Message>, AgentError> {
        let mut transcript = Vec::with_capacity(input.len() + 2);
        if let Some(system_prompt) = &self.config.system_prompt {
            if !system_prompt.is_empty() {
                transcript.push(Message::system(system_prompt.clone()));
            }
        }
        transcript.extend(input);
        let input_len = transcript.len();

        let metadata: Vec<ToolMetadata> =
            self.tools.values().map(|tool| tool.metadata()).collect();

        for step in 0..self.config.max_steps {
            log::debug!("Agent step #{}", step + 1);

            let response = self
                .llm
                .generate(transcript.clone(), Some(metadata.clone()))
                .await?;

            match response.tool_calls {
                Some(calls) if !calls.is_empty() => {
                    transcript.push(Message {
                        role: Role::Assistant,
                        content: response.content.unwrap_or_default(),
                        tool_call_id: None,
                        tool_calls: Some(calls.clone()),
                    });

                    for call in calls {
                        log::info!("Executing tool: {}", call.name);
                        let observation = match self.tools.get(&call.name) {
                            Some(tool) => match tool.execute(call.arguments.clone()).await {
                                Ok(output) => output,
                                Err(e) => {
                                    log::error!("Tool '{}' failed: {}", call.name, e);
                                    format!("Tool '{}' failed: {}", call.name, e)
                                }
                            },
                            None => {
                                log::warn!("Model requested unknown tool: {}", call.name);
                                format!("Unknown tool: {}", call.name)
                            }
                        };
                        transcript.push(Message {
                            role: Role::Tool,
                            content: observation,
                            tool_call_id: call.id,
                            tool_calls: None,
                        });
                    }
                }
                _ => {
                    transcript.push(Message::assistant(response.content.unwrap_or_default()));
                    return Ok(transcript.split_off(input_len));
                }
            }
        }

        log::warn!(
            "Agent reached max_steps ({}) without a final answer",
            self.config.max_steps
        );
        Err(AgentError::MaxStepsReached)
    }
}

//! Bridges the agent invocation to the serving layer.
//!
//! Implements the server's `AgentHandler`: incoming messages become an
//! `AgentState`, the invocation runs once, and the reply messages are
//! streamed back as task events.

use std::sync::Arc;

use argonaut_a2a_server::agent::{AgentHandler, AgentStream};
use argonaut_a2a_server::error::{Result as ServerResult, ServerError};
use argonaut_a2a_server::types::{
    AgentCard, MessageRole, RunErrorEvent, RunFinishedEvent, RunStartedEvent, SendMessageInput,
    TaskEvent, TextMessageContentEvent, TextMessageEndEvent, TextMessageStartEvent,
};
use async_trait::async_trait;
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::invoke::invoke;
use crate::state::{AgentState, ChatMessage};

#[derive(Clone)]
pub struct ArgoCdAgentHandler {
    config: Arc<RuntimeConfig>,
    card: Arc<AgentCard>,
}

impl ArgoCdAgentHandler {
    pub fn new(config: Arc<RuntimeConfig>, card: AgentCard) -> Self {
        Self {
            config,
            card: Arc::new(card),
        }
    }

    fn state_from_input(input: &SendMessageInput) -> AgentState {
        let messages = input
            .messages
            .iter()
            .map(|message| match message.role {
                MessageRole::User => ChatMessage::human(message.content.clone()),
                MessageRole::Assistant => ChatMessage::assistant(message.content.clone()),
            })
            .collect();
        AgentState::from_messages(messages)
    }
}

#[async_trait]
impl AgentHandler for ArgoCdAgentHandler {
    async fn handle_input(&self, input: SendMessageInput) -> ServerResult<AgentStream> {
        if input.messages.iter().all(|m| m.content.is_empty()) {
            return Err(ServerError::invalid_input(
                "No message with content found in input",
            ));
        }

        let state = Self::state_from_input(&input);
        let config = self.config.clone();
        let context_id = input
            .context_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let task_id = Uuid::new_v4().to_string();

        let stream = async_stream::stream! {
            yield TaskEvent::RunStarted(RunStartedEvent {
                context_id: context_id.clone(),
                task_id: task_id.clone(),
            });

            match invoke(state, &config).await {
                Ok(state) => {
                    let messages = state.output.map(|o| o.messages).unwrap_or_default();
                    for message in messages {
                        let message_id = Uuid::new_v4().to_string();
                        yield TaskEvent::TextMessageStart(TextMessageStartEvent {
                            message_id: message_id.clone(),
                        });
                        yield TaskEvent::TextMessageContent(TextMessageContentEvent {
                            message_id: message_id.clone(),
                            delta: message.content,
                        });
                        yield TaskEvent::TextMessageEnd(TextMessageEndEvent { message_id });
                    }
                    yield TaskEvent::RunFinished(RunFinishedEvent { context_id, task_id });
                }
                Err(e) => {
                    log::error!("Agent invocation failed: {}", e);
                    yield TaskEvent::RunError(RunErrorEvent {
                        message: e.to_string(),
                    });
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn agent_card(&self) -> AgentCard {
        (*self.card).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MsgType;
    use argonaut_a2a_server::types::InputMessage;

    #[test]
    fn test_state_from_input_maps_roles() {
        let input = SendMessageInput {
            context_id: None,
            messages: vec![
                InputMessage {
                    role: MessageRole::User,
                    content: "list apps".to_string(),
                },
                InputMessage {
                    role: MessageRole::Assistant,
                    content: "2 applications".to_string(),
                },
            ],
        };
        let state = ArgoCdAgentHandler::state_from_input(&input);
        assert_eq!(state.input.messages[0].msg_type, MsgType::Human);
        assert_eq!(state.input.messages[1].msg_type, MsgType::Assistant);
        assert!(state.output.is_none());
    }
}

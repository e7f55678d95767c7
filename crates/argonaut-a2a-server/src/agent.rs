//! Agent handler trait and stream helpers for the serving layer.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::{Result, ServerError};
use crate::types::{AgentCard, SendMessageInput, TaskEvent};

/// Type alias for agent event streams.
pub type AgentStream = Pin<Box<dyn Stream<Item = TaskEvent> + Send>>;

/// Processes message-send inputs into streams of task events.
#[async_trait]
pub trait AgentHandler: Send + Sync + Clone + 'static {
    /// Handle an input and return the stream of events for the run. Events
    /// are emitted as the agent makes progress; the stream ends with
    /// `RunFinished` or `RunError`.
    async fn handle_input(&self, input: SendMessageInput) -> Result<AgentStream>;

    /// Validate an input before processing. The default requires at least
    /// one message.
    async fn validate_input(&self, input: &SendMessageInput) -> Result<()> {
        if input.messages.is_empty() {
            return Err(ServerError::invalid_input("Messages cannot be empty"));
        }
        Ok(())
    }

    /// The metadata document served to clients.
    fn agent_card(&self) -> AgentCard;
}

/// Helpers for building event streams.
pub mod streams {
    use futures_util::stream;
    use uuid::Uuid;

    use super::AgentStream;
    use crate::types::{
        RunFinishedEvent, RunStartedEvent, TaskEvent, TextMessageContentEvent,
        TextMessageEndEvent, TextMessageStartEvent,
    };

    /// A complete run that emits a single text message.
    pub fn text_response(text: impl Into<String>) -> AgentStream {
        let context_id = Uuid::new_v4().to_string();
        let task_id = Uuid::new_v4().to_string();
        let message_id = Uuid::new_v4().to_string();

        let events = vec![
            TaskEvent::RunStarted(RunStartedEvent {
                context_id: context_id.clone(),
                task_id: task_id.clone(),
            }),
            TaskEvent::TextMessageStart(TextMessageStartEvent {
                message_id: message_id.clone(),
            }),
            TaskEvent::TextMessageContent(TextMessageContentEvent {
                message_id: message_id.clone(),
                delta: text.into(),
            }),
            TaskEvent::TextMessageEnd(TextMessageEndEvent { message_id }),
            TaskEvent::RunFinished(RunFinishedEvent { context_id, task_id }),
        ];

        Box::pin(stream::iter(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_text_response_stream_shape() {
        let mut stream = streams::text_response("hello");
        let mut names = Vec::new();
        while let Some(event) = stream.next().await {
            names.push(event.event_name());
        }
        assert_eq!(
            names,
            vec![
                "RUN_STARTED",
                "TEXT_MESSAGE_START",
                "TEXT_MESSAGE_CONTENT",
                "TEXT_MESSAGE_END",
                "RUN_FINISHED",
            ]
        );
    }
}

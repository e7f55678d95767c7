//! Conversation state threaded through an agent invocation.
//!
//! A state wraps the ordered input messages of one request and, after the
//! invocation, the agent's reply messages. States are created per request and
//! discarded once the response has been returned; nothing here is shared
//! across requests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MsgType {
    Human,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub msg_type: MsgType,
    pub content: String,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            msg_type: MsgType::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            msg_type: MsgType::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct InputState {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OutputState {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AgentState {
    pub input: InputState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputState>,
}

impl AgentState {
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            input: InputState { messages },
            output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_serializes_lowercase() {
        let msg = ChatMessage::human("hello");
        let serialized = serde_json::to_string(&msg).unwrap();
        assert!(serialized.contains(r#""type":"human""#));
    }

    #[test]
    fn test_state_roundtrip() {
        let state = AgentState::from_messages(vec![ChatMessage::human("sync app test-app")]);
        let serialized = serde_json::to_string(&state).unwrap();
        let parsed: AgentState = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed.input.messages.len(), 1);
        assert_eq!(parsed.input.messages[0].msg_type, MsgType::Human);
        assert!(parsed.output.is_none());
    }
}

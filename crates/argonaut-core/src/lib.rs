//! Core library for Argonaut, a conversational agent for ArgoCD.
//!
//! Argonaut fronts an ArgoCD installation with a natural-language interface:
//! user requests are handed to an LLM-driven tool-calling loop whose tools are
//! discovered at runtime from an MCP tool server wrapping the ArgoCD REST API.
//! This crate holds the pieces shared by the binaries: the conversation state
//! model, the ArgoCD API layer, LLM provider clients, the MCP client, the
//! reasoning loop, and the handler that plugs the agent into the serving layer.

pub mod agent;
pub mod argocd;
pub mod config;
pub mod core_types;
pub mod errors;
pub mod handler;
pub mod invoke;
pub mod llm;
pub mod state;
pub mod tools;

pub use agent::{AgentConfig, ReactAgent};
pub use config::{ArgoCdConfig, LlmConfig, LlmProvider, McpCommand, RuntimeConfig};
pub use errors::{AgentError, ArgoCdError};
pub use handler::ArgoCdAgentHandler;
pub use invoke::{invoke, invoke_with};
pub use state::{AgentState, ChatMessage, InputState, MsgType, OutputState};

//! Language model provider abstractions.
//!
//! Defines the `LLM` trait shared by all provider clients and re-exports the
//! provider factory. Providers translate the internal message contract into
//! their wire formats and back; everything upstream of this module is
//! provider-agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use crate::core_types::{LLMResponse, Message};
use crate::errors::AgentError;

pub mod providers;

/// Tool definition surfaced to the model alongside the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[async_trait]
pub trait LLM: Send + Sync {
    async fn generate(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolMetadata>>,
    ) -> Result<LLMResponse, AgentError>;
}

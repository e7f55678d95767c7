//! LLM provider implementations.
//!
//! Each provider implements the common `LLM` trait while handling its own
//! protocol and authentication. The factory keys on the runtime
//! configuration, which is in turn resolved from the environment.

use std::sync::Arc;

use crate::config::{LlmConfig, LlmProvider};
use crate::errors::AgentError;
use crate::llm::LLM;

pub mod anthropic;
pub mod gemini;
pub mod openai;

/// Create an LLM client for the configured provider.
pub fn create_llm_client(config: &LlmConfig) -> Result<Arc<dyn LLM>, AgentError> {
    if config.api_key.is_empty() {
        return Err(AgentError::ConfigError(
            "LLM API key is empty".to_string(),
        ));
    }
    Ok(match config.provider {
        LlmProvider::OpenAi => Arc::new(openai::OpenAiClient::new(config.clone())),
        LlmProvider::Anthropic => Arc::new(anthropic::AnthropicClient::new(config.clone())),
        LlmProvider::Gemini => Arc::new(gemini::GeminiClient::new(config.clone())),
    })
}

/// Default model for a provider when `LLM_MODEL` is unset.
pub fn default_model(provider: &LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "gpt-4.1-mini",
        LlmProvider::Anthropic => "claude-3-5-sonnet-latest",
        LlmProvider::Gemini => "gemini-2.0-flash",
    }
}

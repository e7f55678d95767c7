//! Error types for the agent and the ArgoCD API layer.
//!
//! Failures are values everywhere in this crate: the API layer normalizes
//! transport and status problems into `ArgoCdError`, and the agent layers wrap
//! everything else in `AgentError`. Secrets are scrubbed from error text
//! before it leaves this module's constructors.

use serde_json::{json, Value};
use thiserror::Error;

/// Placeholder substituted for a bearer token wherever it would otherwise
/// leak into an error message.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Replaces every occurrence of `secret` in `message` with a fixed
/// placeholder. A `None` or empty secret leaves the message untouched.
pub fn redact_secret(message: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() => message.replace(secret, REDACTED_PLACEHOLDER),
        _ => message.to_string(),
    }
}

/// Failures produced by the ArgoCD request helper.
///
/// Every branch that embeds free-form text has the token redacted at
/// construction time, including HTTP status errors and the catch-all.
#[derive(Error, Debug, Clone)]
pub enum ArgoCdError {
    #[error("Token is required. Provide one explicitly or set ARGOCD_TOKEN.")]
    MissingToken,
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
    #[error("Request error: {0}")]
    Transport(String),
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        details: Option<Value>,
    },
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ArgoCdError {
    /// Renders the error as the JSON failure shape used on the MCP wire:
    /// `{"error": <message>}` plus structured details when the server
    /// provided any.
    pub fn to_value(&self) -> Value {
        match self {
            ArgoCdError::Status {
                details: Some(details),
                ..
            } => json!({ "error": self.to_string(), "details": details }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("LLM interaction failed: {0}")]
    LLMError(String),
    #[error("Tool execution failed for '{tool_name}': {message}")]
    ToolError { tool_name: String, message: String },
    #[error("MCP client error: {0}")]
    MCPError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Maximum steps reached")]
    MaxStepsReached,
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    ArgoCd(#[from] ArgoCdError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_secret_replaces_all_occurrences() {
        let message = "connect failed for Bearer s3cr3t (token s3cr3t rejected)";
        let redacted = redact_secret(message, Some("s3cr3t"));
        assert!(!redacted.contains("s3cr3t"));
        assert_eq!(redacted.matches(REDACTED_PLACEHOLDER).count(), 2);
    }

    #[test]
    fn test_redact_secret_without_secret() {
        assert_eq!(redact_secret("plain message", None), "plain message");
        assert_eq!(redact_secret("plain message", Some("")), "plain message");
    }

    #[test]
    fn test_status_error_to_value_carries_details() {
        let err = ArgoCdError::Status {
            status: 404,
            message: "API request failed: 404 - application not found".to_string(),
            details: Some(json!({"message": "application not found"})),
        };
        let value = err.to_value();
        assert!(value["error"]
            .as_str()
            .unwrap()
            .contains("application not found"));
        assert_eq!(value["details"]["message"], "application not found");
    }

    #[test]
    fn test_agent_error_wraps_argocd_error() {
        let err: AgentError = ArgoCdError::MissingToken.into();
        assert!(err.to_string().contains("Token is required"));
    }
}

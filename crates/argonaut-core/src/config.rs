//! Runtime configuration for the agent and its ArgoCD backend.
//!
//! Everything is read from the environment exactly once at startup and then
//! passed around as explicit values. Missing required variables fail fast
//! with a `ConfigError` so the process never limps along half-configured.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

/// Connection settings for the ArgoCD REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgoCdConfig {
    /// Base URL of the ArgoCD API server, e.g. `https://argocd.example.com`.
    pub api_url: String,
    /// Default bearer token. Individual requests may override it.
    pub token: Option<String>,
    /// Whether to verify TLS certificates when talking to the server.
    pub verify_tls: bool,
}

impl ArgoCdConfig {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token,
            verify_tls: true,
        }
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Reads `ARGOCD_API_URL`, `ARGOCD_TOKEN` and `ARGOCD_VERIFY_SSL`.
    ///
    /// The URL and token are required; TLS verification defaults to on and
    /// is only disabled by an explicit `false`.
    pub fn from_env() -> Result<Self, AgentError> {
        let api_url = env::var("ARGOCD_API_URL").map_err(|_| {
            AgentError::ConfigError("ARGOCD_API_URL environment variable is not set".to_string())
        })?;
        let token = env::var("ARGOCD_TOKEN").map_err(|_| {
            AgentError::ConfigError("ARGOCD_TOKEN environment variable is not set".to_string())
        })?;
        let verify_tls = env::var("ARGOCD_VERIFY_SSL")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        log::info!("ARGOCD_TOKEN is set");
        log::info!("ARGOCD_VERIFY_SSL is set to: {}", verify_tls);

        Ok(Self {
            api_url,
            token: Some(token),
            verify_tls,
        })
    }
}

/// LLM provider selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
    /// Override for the provider's API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Resolves the provider from `LLM_PROVIDER` (default `gemini`), the
    /// model from `LLM_MODEL` (per-provider default) and the API key from
    /// the provider's conventional variable.
    pub fn from_env() -> Result<Self, AgentError> {
        let provider = match env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "gemini".to_string())
            .to_lowercase()
            .as_str()
        {
            "openai" => LlmProvider::OpenAi,
            "anthropic" => LlmProvider::Anthropic,
            "gemini" | "google-gemini" => LlmProvider::Gemini,
            other => {
                return Err(AgentError::ConfigError(format!(
                    "Unknown LLM_PROVIDER '{}': expected openai, anthropic or gemini",
                    other
                )))
            }
        };

        let key_var = match provider {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::Gemini => "GOOGLE_API_KEY",
        };
        let api_key = env::var(key_var).map_err(|_| {
            AgentError::ConfigError(format!("{} environment variable is not set", key_var))
        })?;

        let model = env::var("LLM_MODEL")
            .unwrap_or_else(|_| crate::llm::providers::default_model(&provider).to_string());

        Ok(Self {
            provider,
            model,
            api_key,
            api_base: None,
            temperature: 0.0,
            max_tokens: 4096,
        })
    }
}

/// How to spawn the MCP tool server process.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpCommand {
    pub run: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl McpCommand {
    /// Spawn spec for the bundled `argonaut-mcp` binary, looked up next to
    /// the current executable, with the ArgoCD settings passed through its
    /// environment.
    pub fn tool_server(argocd: &ArgoCdConfig) -> Self {
        let run = sibling_binary("argonaut-mcp")
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "argonaut-mcp".to_string());

        let mut env = HashMap::new();
        env.insert("ARGOCD_API_URL".to_string(), argocd.api_url.clone());
        if let Some(token) = &argocd.token {
            env.insert("ARGOCD_TOKEN".to_string(), token.clone());
        }
        env.insert(
            "ARGOCD_VERIFY_SSL".to_string(),
            argocd.verify_tls.to_string(),
        );

        Self {
            run,
            args: Vec::new(),
            env,
        }
    }
}

fn sibling_binary(name: &str) -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let dir = exe.parent()?;
    let candidate = dir.join(name);
    candidate.exists().then_some(candidate)
}

/// Process-wide configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub argocd: ArgoCdConfig,
    pub llm: LlmConfig,
    pub mcp: McpCommand,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, AgentError> {
        let argocd = ArgoCdConfig::from_env()?;
        let llm = LlmConfig::from_env()?;
        let mcp = McpCommand::tool_server(&argocd);
        Ok(Self { argocd, llm, mcp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_argocd_config_from_env_requires_url_and_token() {
        env::remove_var("ARGOCD_API_URL");
        env::remove_var("ARGOCD_TOKEN");
        let err = ArgoCdConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("ARGOCD_API_URL"));

        env::set_var("ARGOCD_API_URL", "https://argocd.example.com");
        let err = ArgoCdConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("ARGOCD_TOKEN"));

        env::set_var("ARGOCD_TOKEN", "tok");
        env::set_var("ARGOCD_VERIFY_SSL", "false");
        let config = ArgoCdConfig::from_env().unwrap();
        assert_eq!(config.api_url, "https://argocd.example.com");
        assert!(!config.verify_tls);

        env::remove_var("ARGOCD_API_URL");
        env::remove_var("ARGOCD_TOKEN");
        env::remove_var("ARGOCD_VERIFY_SSL");
    }

    #[test]
    #[serial]
    fn test_llm_config_from_env_requires_provider_key() {
        env::set_var("LLM_PROVIDER", "anthropic");
        env::remove_var("ANTHROPIC_API_KEY");
        let err = LlmConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        env::set_var("ANTHROPIC_API_KEY", "key");
        let config = LlmConfig::from_env().unwrap();
        assert_eq!(config.provider, LlmProvider::Anthropic);
        assert!(!config.model.is_empty());

        env::remove_var("LLM_PROVIDER");
        env::remove_var("ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_argocd_config_defaults_to_verified_tls() {
        let config = ArgoCdConfig::new("https://argocd.example.com", None);
        assert!(config.verify_tls);
        assert!(!config.with_verify_tls(false).verify_tls);
    }

    #[test]
    fn test_tool_server_command_carries_argocd_env() {
        let config = ArgoCdConfig::new("https://argocd.example.com", Some("tok".to_string()))
            .with_verify_tls(false);
        let command = McpCommand::tool_server(&config);
        assert_eq!(
            command.env.get("ARGOCD_API_URL").map(String::as_str),
            Some("https://argocd.example.com")
        );
        assert_eq!(command.env.get("ARGOCD_TOKEN").map(String::as_str), Some("tok"));
        assert_eq!(
            command.env.get("ARGOCD_VERIFY_SSL").map(String::as_str),
            Some("false")
        );
        assert!(command.run.contains("argonaut-mcp"));
    }
}

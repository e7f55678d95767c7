//! Server binary for the Argonaut ArgoCD agent.
//!
//! Validates the environment once at startup, builds the agent card and
//! handler, and serves the agent over HTTP/SSE until shut down.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use argonaut_a2a_server::{
    shutdown_signal, A2aServer, AgentCapabilities, AgentCard, AgentSkill, ServerConfig,
};
use argonaut_core::{ArgoCdAgentHandler, RuntimeConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Argonaut - conversational agent for ArgoCD")]
struct Cli {
    #[clap(long, default_value = "127.0.0.1")]
    host: String,

    #[clap(long, default_value_t = 10000)]
    port: u16,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    // Missing required environment aborts startup with a clear message.
    let config = RuntimeConfig::from_env().map_err(|e| anyhow::anyhow!("{}", e))?;
    log::info!(
        "Configuration loaded: ArgoCD at {}, LLM provider {:?}",
        config.argocd.api_url,
        config.llm.provider
    );

    let bind_addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}:{}': {}", cli.host, cli.port, e))?;

    let card = agent_card(&cli.host, cli.port);
    let handler = ArgoCdAgentHandler::new(Arc::new(config), card);

    let server_config = ServerConfig::default()
        .with_bind_addr(bind_addr)
        .with_logging(true);

    log::info!("Starting Argonaut server on {}...", bind_addr);

    let server = A2aServer::with_config(handler, server_config);
    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    log::info!("Argonaut server shut down gracefully.");
    Ok(())
}

/// Card describing the ArgoCD CRUD skill to clients.
fn agent_card(host: &str, port: u16) -> AgentCard {
    let skill = AgentSkill {
        id: "argocd".to_string(),
        name: "ArgoCD Operations".to_string(),
        description: "Performs Create, Read, Update, and Delete operations on ArgoCD applications."
            .to_string(),
        tags: vec![
            "argocd".to_string(),
            "kubernetes".to_string(),
            "continuous_deployment".to_string(),
            "devops".to_string(),
        ],
        examples: vec![
            r#"Create a new ArgoCD application named "my-app"."#.to_string(),
            r#"Get the status of the "frontend" ArgoCD application."#.to_string(),
            r#"Update the image version for "backend" app."#.to_string(),
            r#"Delete the "test-app" from ArgoCD."#.to_string(),
        ],
    };

    AgentCard {
        name: "ArgoCD CRUD Agent".to_string(),
        description: "Agent for managing ArgoCD applications with CRUD operations.".to_string(),
        url: format!("http://{}:{}/", host, port),
        version: env!("CARGO_PKG_VERSION").to_string(),
        capabilities: AgentCapabilities {
            streaming: true,
            push_notifications: false,
        },
        default_input_modes: vec!["text".to_string(), "text/plain".to_string()],
        default_output_modes: vec!["text".to_string(), "text/plain".to_string()],
        skills: vec![skill],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_card_describes_argocd_skill() {
        let card = agent_card("127.0.0.1", 10000);
        assert_eq!(card.name, "ArgoCD CRUD Agent");
        assert_eq!(card.url, "http://127.0.0.1:10000/");
        assert_eq!(card.skills.len(), 1);
        assert_eq!(card.skills[0].id, "argocd");
        assert!(card.capabilities.streaming);
    }
}

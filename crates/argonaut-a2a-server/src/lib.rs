//! HTTP serving layer for the Argonaut agent.
//!
//! Exposes a small request/response surface around an `AgentHandler`: the
//! agent card for discovery, a non-streaming message endpoint that collects
//! the run into one JSON response, and a streaming endpoint that forwards
//! task events over SSE. Everything conversation-related is delegated to the
//! handler; this crate only does transport.

pub mod agent;
pub mod error;
pub mod sse;
pub mod types;

pub use agent::{AgentHandler, AgentStream};
pub use error::{Result, ServerError};
pub use sse::{SseEvent, SseStream};
pub use types::{
    AgentCapabilities, AgentCard, AgentSkill, InputMessage, MessageRole, RunErrorEvent,
    RunFinishedEvent, RunStartedEvent, SendMessageInput, TaskEvent, TextMessageContentEvent,
    TextMessageEndEvent, TextMessageStartEvent,
};

use axum::extract::{Json as AxumJson, State};
use axum::http::StatusCode;
use axum::response::{Json, Response};
use axum::routing::{get, post};
use axum::{middleware, Router};
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// Configuration for the serving layer.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub enable_cors: bool,
    pub enable_logging: bool,
    /// Keep-alive interval for SSE connections.
    pub sse_keepalive_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:10000".parse().unwrap(),
            enable_cors: true,
            enable_logging: true,
            sse_keepalive_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_bind_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| ServerError::config_error(format!("Invalid bind address: {}", e)))?;
        Ok(self)
    }

    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    pub fn with_sse_keepalive(mut self, interval: Duration) -> Self {
        self.sse_keepalive_interval = interval;
        self
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState<T: AgentHandler> {
    pub agent: T,
    pub config: ServerConfig,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn agent_card_handler<T: AgentHandler>(
    State(app_state): State<AppState<T>>,
) -> Json<AgentCard> {
    Json(app_state.agent.agent_card())
}

fn error_response(error: &ServerError) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(json!({
            "error": error.to_string(),
            "timestamp": chrono::Utc::now(),
        })),
    )
}

/// Non-streaming send: runs the agent and collects the reply messages.
async fn message_handler<T: AgentHandler>(
    State(app_state): State<AppState<T>>,
    AxumJson(input): AxumJson<SendMessageInput>,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if let Err(e) = app_state.agent.validate_input(&input).await {
        log::warn!("Input validation failed: {}", e);
        return Err(error_response(&e));
    }

    let mut stream = match app_state.agent.handle_input(input).await {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("Agent failed to handle input: {}", e);
            return Err(error_response(&e));
        }
    };

    let mut context_id = None;
    let mut task_id = None;
    let mut messages: Vec<serde_json::Value> = Vec::new();
    let mut current = String::new();
    let mut failure = None;

    while let Some(event) = stream.next().await {
        match event {
            TaskEvent::RunStarted(started) => {
                context_id = Some(started.context_id);
                task_id = Some(started.task_id);
            }
            TaskEvent::TextMessageStart(_) => current.clear(),
            TaskEvent::TextMessageContent(content) => current.push_str(&content.delta),
            TaskEvent::TextMessageEnd(_) => {
                messages.push(json!({ "role": "assistant", "content": current.clone() }));
            }
            TaskEvent::RunFinished(_) => {}
            TaskEvent::RunError(error) => failure = Some(error.message),
        }
    }

    if let Some(message) = failure {
        return Err(error_response(&ServerError::agent(message)));
    }

    Ok(Json(json!({
        "contextId": context_id,
        "taskId": task_id,
        "status": "completed",
        "messages": messages,
    })))
}

/// Streaming send: forwards task events over SSE.
async fn message_stream_handler<T: AgentHandler>(
    State(app_state): State<AppState<T>>,
    AxumJson(input): AxumJson<SendMessageInput>,
) -> std::result::Result<Response, (StatusCode, Json<serde_json::Value>)> {
    if let Err(e) = app_state.agent.validate_input(&input).await {
        log::warn!("Input validation failed: {}", e);
        return Err(error_response(&e));
    }

    let event_stream = match app_state.agent.handle_input(input).await {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("Agent failed to handle input: {}", e);
            return Err(error_response(&e));
        }
    };

    Ok(sse::create_sse_response(
        event_stream,
        app_state.config.sse_keepalive_interval,
    ))
}

/// The agent server.
pub struct A2aServer<T: AgentHandler> {
    agent: T,
    config: ServerConfig,
}

impl<T: AgentHandler> A2aServer<T> {
    pub fn new(agent: T) -> Self {
        Self {
            agent,
            config: ServerConfig::default(),
        }
    }

    pub fn with_config(agent: T, config: ServerConfig) -> Self {
        Self { agent, config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            agent: self.agent.clone(),
            config: self.config.clone(),
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/.well-known/agent-card.json", get(agent_card_handler::<T>))
            .route("/message", post(message_handler::<T>))
            .route("/message/stream", post(message_stream_handler::<T>))
            .with_state(state);

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let uri = request.uri().clone();
                    log::info!("Request {} {} {}", request_id, method, uri);

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    log::info!("Response {} completed in {:?}", request_id, start.elapsed());

                    response
                },
            ));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(CorsLayer::permissive());
        }

        router
    }

    /// Start the server and block until it shuts down.
    pub async fn serve(self) -> Result<()> {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr).await.map_err(|e| {
            ServerError::config_error(format!(
                "Failed to bind to {}: {}",
                self.config.bind_addr, e
            ))
        })?;

        log::info!("Agent server starting on {}", self.config.bind_addr);
        log::info!(
            "Agent card: http://{}/.well-known/agent-card.json",
            self.config.bind_addr
        );
        log::info!("Message endpoint: http://{}/message", self.config.bind_addr);
        log::info!(
            "Stream endpoint: http://{}/message/stream",
            self.config.bind_addr
        );

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))
    }

    /// Start the server with graceful shutdown on the given signal.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr).await.map_err(|e| {
            ServerError::config_error(format!(
                "Failed to bind to {}: {}",
                self.config.bind_addr, e
            ))
        })?;

        log::info!(
            "Agent server starting on {} with graceful shutdown",
            self.config.bind_addr
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("Agent server shut down gracefully");
        Ok(())
    }
}

/// Shutdown signal from Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::streams;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt; // for `oneshot`

    #[derive(Clone)]
    struct MockAgent;

    #[async_trait]
    impl AgentHandler for MockAgent {
        async fn handle_input(&self, input: SendMessageInput) -> Result<AgentStream> {
            let last = input
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(streams::text_response(format!("Echo: {}", last)))
        }

        fn agent_card(&self) -> AgentCard {
            AgentCard {
                name: "Mock Agent".to_string(),
                description: "Test agent".to_string(),
                url: "http://127.0.0.1:10000/".to_string(),
                version: "1.0.0".to_string(),
                capabilities: AgentCapabilities {
                    streaming: true,
                    push_notifications: false,
                },
                default_input_modes: vec!["text/plain".to_string()],
                default_output_modes: vec!["text/plain".to_string()],
                skills: vec![],
            }
        }
    }

    fn test_router() -> Router {
        A2aServer::with_config(
            MockAgent,
            ServerConfig::default().with_logging(false),
        )
        .build_router()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_agent_card_endpoint() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/.well-known/agent-card.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let card: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(card["name"], "Mock Agent");
        assert_eq!(card["capabilities"]["streaming"], true);
    }

    #[tokio::test]
    async fn test_message_endpoint_collects_reply() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/message")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"messages":[{"role":"user","content":"sync app test-app"}]}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "completed");
        assert_eq!(body["messages"][0]["content"], "Echo: sync app test-app");
    }

    #[tokio::test]
    async fn test_message_endpoint_rejects_empty_messages() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/message")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"messages":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! Behavior of the ArgoCD request helper against a live local HTTP server.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;

use argonaut_core::argocd::{applications, ApiResponse, ArgoCdClient, RequestOptions};
use argonaut_core::config::ArgoCdConfig;
use argonaut_core::errors::ArgoCdError;

const TEST_TOKEN: &str = "test-token-123";

async fn spawn_mock_server() -> SocketAddr {
    let router = Router::new()
        .route(
            "/api/v1/applications",
            get(|| async { Json(json!({"items": [{"metadata": {"name": "guestbook"}}]})) }),
        )
        .route(
            "/api/v1/applications/{name}/sync",
            post(|| async { Json(json!({"status": {"operationState": {"phase": "Running"}}})) }),
        )
        .route(
            "/api/v1/applications/{name}",
            delete(|| async { StatusCode::NO_CONTENT }),
        )
        .route("/plain", get(|| async { "plain text body" }))
        .route(
            "/error-json",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "cluster unavailable"})),
                )
            }),
        )
        .route(
            "/error-message",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"message": "application not found"})),
                )
            }),
        )
        .route(
            "/error-text",
            get(|| async {
                (StatusCode::BAD_GATEWAY, "x".repeat(1000)).into_response()
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "too late"
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn test_client() -> ArgoCdClient {
    let addr = spawn_mock_server().await;
    ArgoCdClient::new(ArgoCdConfig::new(
        format!("http://{}", addr),
        Some(TEST_TOKEN.to_string()),
    ))
}

#[tokio::test]
async fn test_200_json_body_is_parsed() {
    let client = test_client().await;
    let response = client
        .get("/api/v1/applications", Vec::new())
        .await
        .unwrap();
    match response {
        ApiResponse::Json(value) => {
            assert_eq!(value["items"][0]["metadata"]["name"], "guestbook");
        }
        other => panic!("expected Json, got {:?}", other),
    }
}

#[tokio::test]
async fn test_200_non_json_body_yields_raw_text() {
    let client = test_client().await;
    let response = client.get("/plain", Vec::new()).await.unwrap();
    assert_eq!(response, ApiResponse::Text("plain text body".to_string()));

    let value = client.get("/plain", Vec::new()).await.unwrap().into_value();
    assert_eq!(value["status"], "success");
    assert_eq!(value["raw_response"], "plain text body");
}

#[tokio::test]
async fn test_204_yields_fixed_success_marker() {
    let client = test_client().await;
    let response = client
        .delete("/api/v1/applications/test-app", Vec::new())
        .await
        .unwrap();
    assert_eq!(response, ApiResponse::NoContent);
    assert_eq!(
        client
            .delete("/api/v1/applications/test-app", Vec::new())
            .await
            .unwrap()
            .into_value(),
        json!({"status": "success"})
    );
}

#[tokio::test]
async fn test_error_body_with_error_field_enriches_message() {
    let client = test_client().await;
    let err = client.get("/error-json", Vec::new()).await.unwrap_err();
    match err {
        ArgoCdError::Status {
            status,
            message,
            details,
        } => {
            assert_eq!(status, 500);
            assert!(message.contains("cluster unavailable"));
            assert_eq!(details.unwrap()["error"], "cluster unavailable");
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_body_with_message_field_enriches_message() {
    let client = test_client().await;
    let err = client.get("/error-message", Vec::new()).await.unwrap_err();
    match err {
        ArgoCdError::Status { status, message, .. } => {
            assert_eq!(status, 404);
            assert!(message.contains("application not found"));
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_error_body_is_truncated() {
    let client = test_client().await;
    let err = client.get("/error-text", Vec::new()).await.unwrap_err();
    match err {
        ArgoCdError::Status { status, message, details } => {
            assert_eq!(status, 502);
            assert!(details.is_none());
            // "API request failed: 502 - " plus at most 200 chars of body.
            assert!(message.len() <= 230);
            assert!(message.contains("xxx"));
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_is_reported_as_timeout() {
    let client = test_client().await;
    let err = client
        .request(
            "GET",
            "/slow",
            RequestOptions {
                timeout: Duration::from_millis(200),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ArgoCdError::Timeout { .. }));
}

#[tokio::test]
async fn test_transport_error_never_contains_token() {
    // The token is baked into the request path of an unreachable server so
    // that any URL echoed into the transport error would leak it.
    let client = ArgoCdClient::new(ArgoCdConfig::new(
        format!("http://127.0.0.1:9/{}", TEST_TOKEN),
        Some(TEST_TOKEN.to_string()),
    ));

    let err = client
        .request(
            "GET",
            "/api/v1/applications",
            RequestOptions {
                timeout: Duration::from_secs(2),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    let rendered = err.to_string();
    assert!(!rendered.contains(TEST_TOKEN), "token leaked: {}", rendered);
}

#[tokio::test]
async fn test_list_applications_condenses_items() {
    let client = test_client().await;
    let result = applications::list_applications(&client, None, None)
        .await
        .unwrap();
    assert_eq!(result["count"], 1);
    assert_eq!(result["applications"][0]["name"], "guestbook");
}

#[tokio::test]
async fn test_sync_application_reports_initiation() {
    let client = test_client().await;
    let result = applications::sync_application(&client, "test-app", None, false, true)
        .await
        .unwrap();
    assert_eq!(result["status"], "sync_initiated");
    assert_eq!(result["dryRun"], true);
    assert_eq!(result["operation"]["phase"], "Running");
}

#[tokio::test]
async fn test_sync_post_round_trip() {
    let client = test_client().await;
    let response = client
        .post(
            "/api/v1/applications/test-app/sync",
            json!({"prune": false, "dryRun": false}),
        )
        .await
        .unwrap();
    match response {
        ApiResponse::Json(value) => {
            assert_eq!(value["status"]["operationState"]["phase"], "Running");
        }
        other => panic!("expected Json, got {:?}", other),
    }
}

//! Generic authenticated request helper for the ArgoCD REST API.
//!
//! The helper normalizes every outcome into either an `ApiResponse` or an
//! `ArgoCdError`: 2xx bodies are parsed as JSON with a raw-text fallback,
//! non-2xx bodies are mined for an `error` or `message` field, and transport
//! failures are classified as timeout or transport errors. The bearer token
//! is resolved per call (explicit argument over configured default) and
//! scrubbed from every error message before it is returned.

use std::time::Duration;

use reqwest::{header, Method};
use serde_json::Value;

use crate::config::ArgoCdConfig;
use crate::errors::{redact_secret, ArgoCdError};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const ERROR_BODY_SNIPPET_LEN: usize = 200;

/// Per-request options for [`ArgoCdClient::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Overrides the configured default token for this call.
    pub token: Option<String>,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            token: None,
            params: Vec::new(),
            body: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Successful outcome of an API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Parsed JSON body from a 200/201/202 response.
    Json(Value),
    /// 2xx response whose body was not valid JSON.
    Text(String),
    /// 204 No Content.
    NoContent,
}

impl ApiResponse {
    /// Converts the response into the JSON success shape used on the MCP
    /// wire. `NoContent` and `Text` become explicit success markers so tool
    /// output always has a uniform envelope.
    pub fn into_value(self) -> Value {
        match self {
            ApiResponse::Json(value) => value,
            ApiResponse::Text(raw) => serde_json::json!({
                "status": "success",
                "raw_response": raw,
            }),
            ApiResponse::NoContent => serde_json::json!({ "status": "success" }),
        }
    }
}

pub struct ArgoCdClient {
    config: ArgoCdConfig,
}

impl ArgoCdClient {
    pub fn new(config: ArgoCdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArgoCdConfig {
        &self.config
    }

    /// Issues a request against `path` under the configured base URL.
    ///
    /// Token resolution and method validation happen before any network I/O;
    /// a missing token or an unsupported method never leaves the process.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        opts: RequestOptions,
    ) -> Result<ApiResponse, ArgoCdError> {
        log::debug!("Making {} request to {}", method, path);

        let token = match opts.token.or_else(|| self.config.token.clone()) {
            Some(token) if !token.is_empty() => token,
            _ => {
                log::error!("No token available - neither provided nor configured");
                return Err(ArgoCdError::MissingToken);
            }
        };

        let method_name = method.to_uppercase();
        let method = match method_name.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "PATCH" => Method::PATCH,
            "DELETE" => Method::DELETE,
            other => {
                log::error!("Unsupported HTTP method: {}", other);
                return Err(ArgoCdError::UnsupportedMethod(other.to_string()));
            }
        };
        // Only methods with a request body carry the JSON payload.
        let has_body = matches!(method_name.as_str(), "POST" | "PUT" | "PATCH");

        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), path);
        log::debug!("Full request URL: {}", url);
        if !opts.params.is_empty() {
            log::debug!("Request parameters: {:?}", opts.params);
        }

        // One connection per call; the client is dropped on every exit path.
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.config.verify_tls)
            .build()
            .map_err(|e| ArgoCdError::Unexpected(redact_secret(&e.to_string(), Some(&token))))?;

        let mut request = client
            .request(method, &url)
            .bearer_auth(&token)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(opts.timeout);
        if !opts.params.is_empty() {
            request = request.query(&opts.params);
        }
        if has_body {
            if let Some(body) = &opts.body {
                request = request.json(body);
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                log::error!("Request timed out after {} seconds", opts.timeout.as_secs());
                return Err(ArgoCdError::Timeout {
                    seconds: opts.timeout.as_secs(),
                });
            }
            Err(e) => {
                let message = redact_secret(&e.to_string(), Some(&token));
                log::error!("Request error: {}", message);
                return Err(ArgoCdError::Transport(message));
            }
        };

        let status = response.status().as_u16();
        log::debug!("Response status code: {}", status);

        match status {
            204 => Ok(ApiResponse::NoContent),
            200 | 201 | 202 => {
                let text = response.text().await.map_err(|e| {
                    ArgoCdError::Unexpected(redact_secret(&e.to_string(), Some(&token)))
                })?;
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => Ok(ApiResponse::Json(value)),
                    Err(_) => {
                        log::warn!("Request successful but response body was not JSON");
                        Ok(ApiResponse::Text(text))
                    }
                }
            }
            _ => {
                let mut message = format!("API request failed: {}", status);
                let text = response.text().await.unwrap_or_default();
                match serde_json::from_str::<Value>(&text) {
                    Ok(details) => {
                        if let Some(detail) = details
                            .get("error")
                            .or_else(|| details.get("message"))
                            .and_then(Value::as_str)
                        {
                            message = format!("{} - {}", message, detail);
                        }
                        let message = redact_secret(&message, Some(&token));
                        log::error!("{}", message);
                        Err(ArgoCdError::Status {
                            status,
                            message,
                            details: Some(details),
                        })
                    }
                    Err(_) => {
                        let snippet: String = text.chars().take(ERROR_BODY_SNIPPET_LEN).collect();
                        let message =
                            redact_secret(&format!("{} - {}", message, snippet), Some(&token));
                        log::error!("{}", message);
                        Err(ArgoCdError::Status {
                            status,
                            message,
                            details: None,
                        })
                    }
                }
            }
        }
    }

    pub async fn get(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<ApiResponse, ArgoCdError> {
        self.request(
            "GET",
            path,
            RequestOptions {
                params,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<ApiResponse, ArgoCdError> {
        self.request(
            "POST",
            path,
            RequestOptions {
                body: Some(body),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<ApiResponse, ArgoCdError> {
        self.request(
            "PUT",
            path,
            RequestOptions {
                body: Some(body),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<ApiResponse, ArgoCdError> {
        self.request(
            "PATCH",
            path,
            RequestOptions {
                body: Some(body),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<ApiResponse, ArgoCdError> {
        self.request(
            "DELETE",
            path,
            RequestOptions {
                params,
                ..Default::default()
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_without_token() -> ArgoCdClient {
        ArgoCdClient::new(ArgoCdConfig::new("https://argocd.invalid", None))
    }

    fn client_with_token() -> ArgoCdClient {
        ArgoCdClient::new(ArgoCdConfig::new(
            "https://argocd.invalid",
            Some("dummy-token".to_string()),
        ))
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_network_io() {
        // The base URL is unresolvable, so reaching the network would error
        // differently; MissingToken proves the call never got that far.
        let client = client_without_token();
        let err = client
            .request("GET", "/api/v1/applications", RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ArgoCdError::MissingToken));
    }

    #[tokio::test]
    async fn test_unsupported_method_fails_without_network_io() {
        let client = client_with_token();
        for method in ["HEAD", "OPTIONS", "TRACE", "CONNECT", "FOO"] {
            let err = client
                .request(method, "/api/v1/applications", RequestOptions::default())
                .await
                .unwrap_err();
            match err {
                ArgoCdError::UnsupportedMethod(m) => assert_eq!(m, method),
                other => panic!("expected UnsupportedMethod, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_explicit_token_overrides_missing_default() {
        // With an explicit token the call proceeds past validation and fails
        // at the transport layer instead.
        let client = client_without_token();
        let err = client
            .request(
                "GET",
                "/api/v1/applications",
                RequestOptions {
                    token: Some("explicit".to_string()),
                    timeout: Duration::from_millis(250),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(!matches!(err, ArgoCdError::MissingToken));
    }

    #[test]
    fn test_api_response_into_value_markers() {
        assert_eq!(
            ApiResponse::NoContent.into_value(),
            serde_json::json!({"status": "success"})
        );
        let value = ApiResponse::Text("plain".to_string()).into_value();
        assert_eq!(value["status"], "success");
        assert_eq!(value["raw_response"], "plain");
        assert_eq!(
            ApiResponse::Json(serde_json::json!({"items": []})).into_value(),
            serde_json::json!({"items": []})
        );
    }
}

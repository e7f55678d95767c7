//! MCP tool server for ArgoCD application operations.
//!
//! Speaks JSON-RPC 2.0 over stdio: `initialize`, `tools/list` and
//! `tools/call`. Tool output goes back as a single text content block.
//! Configuration comes from the environment once at startup; logs go to
//! stderr so stdout stays a clean protocol channel.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use argonaut_core::argocd::{applications, ArgoCdClient};
use argonaut_core::config::ArgoCdConfig;

const MCP_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "argonaut-mcp";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ArgoCdConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let client = ArgoCdClient::new(config);

    log::info!("Starting {} v{}", SERVER_NAME, env!("CARGO_PKG_VERSION"));

    let stdin = io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(line) if !line.is_empty() => line,
            Ok(_) => continue,
            Err(e) => {
                log::error!("Failed to read from stdin: {}", e);
                break;
            }
        };

        log::debug!("Received: {}", line);

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(request) => handle_request(&request, &client).await,
            Err(e) => Some(json!({
                "jsonrpc": "2.0",
                "id": Value::Null,
                "error": { "code": -32700, "message": format!("Parse error: {}", e) }
            })),
        };

        if let Some(response) = response {
            if let Ok(serialized) = serde_json::to_string(&response) {
                println!("{}", serialized);
                let _ = io::stdout().flush();
            }
        }
    }
}

/// Routes one JSON-RPC request. Notifications return `None`.
async fn handle_request(request: &Value, client: &ArgoCdClient) -> Option<Value> {
    let method = request.get("method").and_then(Value::as_str)?;
    let req_id = request.get("id").cloned().unwrap_or(Value::Null);

    match method {
        "initialize" => Some(handle_initialize(&req_id)),
        "tools/list" => Some(handle_list_tools(&req_id)),
        "tools/call" => Some(handle_tool_call(request, &req_id, client).await),
        "notifications/initialized" => None,
        _ => Some(json!({
            "jsonrpc": "2.0",
            "id": req_id,
            "error": { "code": -32601, "message": format!("Method not found: {}", method) }
        })),
    }
}

fn handle_initialize(req_id: &Value) -> Value {
    log::info!("Received initialize request");
    json!({
        "jsonrpc": "2.0",
        "id": req_id,
        "result": {
            "protocolVersion": MCP_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        }
    })
}

fn handle_list_tools(req_id: &Value) -> Value {
    log::debug!("Listing available tools");
    json!({
        "jsonrpc": "2.0",
        "id": req_id,
        "result": { "tools": applications::tool_descriptors() }
    })
}

async fn handle_tool_call(request: &Value, req_id: &Value, client: &ArgoCdClient) -> Value {
    let tool_name = request
        .pointer("/params/name")
        .and_then(Value::as_str)
        .unwrap_or("");
    let args = request
        .pointer("/params/arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    log::debug!("Calling tool: {}", tool_name);

    let result = match tool_name {
        "argocd_app_list" => tool_app_list(&args, client).await,
        "argocd_app_get" => tool_app_get(&args, client).await,
        "argocd_app_create" => tool_app_create(&args, client).await,
        "argocd_app_update" => tool_app_update(&args, client).await,
        "argocd_app_delete" => tool_app_delete(&args, client).await,
        "argocd_app_sync" => tool_app_sync(&args, client).await,
        _ => {
            return json!({
                "jsonrpc": "2.0",
                "id": req_id,
                "error": { "code": -32601, "message": format!("Tool not found: {}", tool_name) }
            });
        }
    };

    json!({
        "jsonrpc": "2.0",
        "id": req_id,
        "result": {
            "content": [{
                "type": "text",
                "text": serde_json::to_string(&result).unwrap_or_else(|_| "{}".to_string())
            }],
            "isError": result.get("error").is_some()
        }
    })
}

fn missing_argument(name: &str) -> Value {
    json!({ "error": format!("Missing required argument: {}", name) })
}

async fn tool_app_list(args: &Value, client: &ArgoCdClient) -> Value {
    let project = args.get("project").and_then(Value::as_str);
    let selector = args.get("selector").and_then(Value::as_str);
    applications::list_applications(client, project, selector)
        .await
        .unwrap_or_else(|e| e.to_value())
}

async fn tool_app_get(args: &Value, client: &ArgoCdClient) -> Value {
    let Some(name) = args.get("name").and_then(Value::as_str) else {
        return missing_argument("name");
    };
    let refresh = args.get("refresh").and_then(Value::as_str);
    applications::get_application(client, name, refresh)
        .await
        .unwrap_or_else(|e| e.to_value())
}

async fn tool_app_create(args: &Value, client: &ArgoCdClient) -> Value {
    let Some(application) = args.get("application").filter(|v| v.is_object()) else {
        return missing_argument("application");
    };
    let upsert = args.get("upsert").and_then(Value::as_bool).unwrap_or(false);
    applications::create_application(client, application.clone(), upsert)
        .await
        .unwrap_or_else(|e| e.to_value())
}

async fn tool_app_update(args: &Value, client: &ArgoCdClient) -> Value {
    let Some(name) = args.get("name").and_then(Value::as_str) else {
        return missing_argument("name");
    };
    let Some(application) = args.get("application").filter(|v| v.is_object()) else {
        return missing_argument("application");
    };
    applications::update_application(client, name, application.clone())
        .await
        .unwrap_or_else(|e| e.to_value())
}

async fn tool_app_delete(args: &Value, client: &ArgoCdClient) -> Value {
    let Some(name) = args.get("name").and_then(Value::as_str) else {
        return missing_argument("name");
    };
    let cascade = args.get("cascade").and_then(Value::as_bool);
    applications::delete_application(client, name, cascade)
        .await
        .unwrap_or_else(|e| e.to_value())
}

async fn tool_app_sync(args: &Value, client: &ArgoCdClient) -> Value {
    let Some(name) = args.get("name").and_then(Value::as_str) else {
        return missing_argument("name");
    };
    let revision = args.get("revision").and_then(Value::as_str);
    let prune = args.get("prune").and_then(Value::as_bool).unwrap_or(false);
    let dry_run = args.get("dry_run").and_then(Value::as_bool).unwrap_or(false);
    applications::sync_application(client, name, revision, prune, dry_run)
        .await
        .unwrap_or_else(|e| e.to_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argonaut_core::config::ArgoCdConfig;

    fn test_client() -> ArgoCdClient {
        ArgoCdClient::new(ArgoCdConfig::new(
            "https://argocd.invalid",
            Some("dummy-token".to_string()),
        ))
    }

    #[test]
    fn test_initialize_response_shape() {
        let response = handle_initialize(&json!(1));
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["result"]["protocolVersion"], MCP_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
    }

    #[test]
    fn test_list_tools_names_all_operations() {
        let response = handle_list_tools(&json!(2));
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 6);
        assert!(tools.iter().any(|t| t["name"] == "argocd_app_sync"));
    }

    #[tokio::test]
    async fn test_unknown_method_returns_method_not_found() {
        let client = test_client();
        let request = json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"});
        let response = handle_request(&request, &client).await.unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_unknown_tool_returns_method_not_found() {
        let client = test_client();
        let request = json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": { "name": "argocd_app_rollback", "arguments": {} }
        });
        let response = handle_request(&request, &client).await.unwrap();
        assert_eq!(response["error"]["code"], -32601);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("argocd_app_rollback"));
    }

    #[tokio::test]
    async fn test_missing_required_argument_is_a_tool_error() {
        let client = test_client();
        let request = json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": { "name": "argocd_app_sync", "arguments": {} }
        });
        let response = handle_request(&request, &client).await.unwrap();
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Missing required argument: name"));
    }

    #[tokio::test]
    async fn test_initialized_notification_has_no_response() {
        let client = test_client();
        let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(handle_request(&request, &client).await.is_none());
    }
}

//! Application CRUD operations against the ArgoCD API.
//!
//! Each operation returns a `serde_json::Value` shaped for LLM consumption.
//! `tool_descriptors` lists the same operations as MCP tool definitions so
//! the tool server can advertise them.

use serde_json::{json, Value};

use crate::argocd::client::{ApiResponse, ArgoCdClient};
use crate::errors::ArgoCdError;

fn app_path(name: &str) -> String {
    format!("/api/v1/applications/{}", urlencoding::encode(name))
}

/// Lists applications, optionally filtered by project and label selector.
pub async fn list_applications(
    client: &ArgoCdClient,
    project: Option<&str>,
    selector: Option<&str>,
) -> Result<Value, ArgoCdError> {
    let mut params = Vec::new();
    if let Some(project) = project {
        params.push(("projects".to_string(), project.to_string()));
    }
    if let Some(selector) = selector {
        params.push(("selector".to_string(), selector.to_string()));
    }

    let body = client.get("/api/v1/applications", params).await?.into_value();
    let items = body.get("items").cloned().unwrap_or_else(|| json!([]));

    // Condense each application to what the agent needs for follow-ups.
    let applications: Vec<Value> = items
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|app| {
            json!({
                "name": app.pointer("/metadata/name"),
                "project": app.pointer("/spec/project"),
                "namespace": app.pointer("/spec/destination/namespace"),
                "syncStatus": app.pointer("/status/sync/status"),
                "healthStatus": app.pointer("/status/health/status"),
                "revision": app.pointer("/status/sync/revision"),
            })
        })
        .collect();

    Ok(json!({
        "applications": applications,
        "count": applications.len(),
    }))
}

/// Fetches a single application, optionally forcing a refresh from the
/// cluster (`normal`) or from Git (`hard`).
pub async fn get_application(
    client: &ArgoCdClient,
    name: &str,
    refresh: Option<&str>,
) -> Result<Value, ArgoCdError> {
    let mut params = Vec::new();
    if let Some(refresh) = refresh {
        params.push(("refresh".to_string(), refresh.to_string()));
    }
    Ok(client.get(&app_path(name), params).await?.into_value())
}

/// Creates an application from a full manifest. With `upsert` an existing
/// application of the same name is updated instead of rejected.
pub async fn create_application(
    client: &ArgoCdClient,
    application: Value,
    upsert: bool,
) -> Result<Value, ArgoCdError> {
    let path = if upsert {
        "/api/v1/applications?upsert=true".to_string()
    } else {
        "/api/v1/applications".to_string()
    };
    Ok(client.post(&path, application).await?.into_value())
}

/// Replaces an application's manifest.
pub async fn update_application(
    client: &ArgoCdClient,
    name: &str,
    application: Value,
) -> Result<Value, ArgoCdError> {
    Ok(client.put(&app_path(name), application).await?.into_value())
}

/// Deletes an application. `cascade` also removes the application's
/// resources from the cluster.
pub async fn delete_application(
    client: &ArgoCdClient,
    name: &str,
    cascade: Option<bool>,
) -> Result<Value, ArgoCdError> {
    let mut params = Vec::new();
    if let Some(cascade) = cascade {
        params.push(("cascade".to_string(), cascade.to_string()));
    }
    let result = client.delete(&app_path(name), params).await?.into_value();
    Ok(json!({
        "name": name,
        "status": "deleted",
        "response": result,
    }))
}

/// Triggers a sync, optionally pinned to a revision, with prune and dry-run
/// switches.
pub async fn sync_application(
    client: &ArgoCdClient,
    name: &str,
    revision: Option<&str>,
    prune: bool,
    dry_run: bool,
) -> Result<Value, ArgoCdError> {
    let mut body = json!({
        "prune": prune,
        "dryRun": dry_run,
    });
    if let Some(revision) = revision {
        body["revision"] = json!(revision);
    }

    let result = client
        .post(&format!("{}/sync", app_path(name)), body)
        .await?
        .into_value();

    Ok(json!({
        "name": name,
        "status": "sync_initiated",
        "dryRun": dry_run,
        "prune": prune,
        "operation": result.pointer("/status/operationState"),
    }))
}

/// MCP tool definitions for the operations above, in `tools/list` shape.
pub fn tool_descriptors() -> Vec<Value> {
    vec![
        json!({
            "name": "argocd_app_list",
            "description": "List ArgoCD applications with their sync and health status. Supports filtering by project and label selector.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project": { "type": "string", "description": "Filter by project name" },
                    "selector": { "type": "string", "description": "Label selector, e.g. 'app=nginx,env=prod'" }
                }
            }
        }),
        json!({
            "name": "argocd_app_get",
            "description": "Get the full manifest and status of an ArgoCD application.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Application name" },
                    "refresh": { "type": "string", "enum": ["normal", "hard"], "description": "Refresh from cluster (normal) or Git (hard) before returning" }
                },
                "required": ["name"]
            }
        }),
        json!({
            "name": "argocd_app_create",
            "description": "Create an ArgoCD application from a full application manifest.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "application": { "type": "object", "description": "Application manifest (metadata, spec)" },
                    "upsert": { "type": "boolean", "description": "Update the application if it already exists", "default": false }
                },
                "required": ["application"]
            }
        }),
        json!({
            "name": "argocd_app_update",
            "description": "Replace the manifest of an existing ArgoCD application.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Application name" },
                    "application": { "type": "object", "description": "New application manifest" }
                },
                "required": ["name", "application"]
            }
        }),
        json!({
            "name": "argocd_app_delete",
            "description": "Delete an ArgoCD application, optionally cascading to its cluster resources.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Application name" },
                    "cascade": { "type": "boolean", "description": "Also delete the application's resources" }
                },
                "required": ["name"]
            }
        }),
        json!({
            "name": "argocd_app_sync",
            "description": "Trigger a sync of an ArgoCD application to its target revision. Supports prune and dry-run.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Application name" },
                    "revision": { "type": "string", "description": "Git revision to sync to (commit SHA, branch or tag)" },
                    "prune": { "type": "boolean", "description": "Remove resources not present in Git", "default": false },
                    "dry_run": { "type": "boolean", "description": "Preview the sync without applying changes", "default": false }
                },
                "required": ["name"]
            }
        }),
    ]
}

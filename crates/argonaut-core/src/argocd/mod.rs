//! ArgoCD REST API layer.
//!
//! `client` holds the generic authenticated request helper; `applications`
//! builds the application CRUD operations on top of it and describes them as
//! MCP tools for the tool server.

pub mod applications;
pub mod client;

pub use client::{ApiResponse, ArgoCdClient, RequestOptions};

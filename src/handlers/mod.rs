//! HTTP handlers, one module per resource.
//!
//! Handlers return `Result<_, ApiError>`; role gating happens on the route groups in
//! `routes`, resource-level checks (document visibility, message participants) happen
//! here.

use axum::{Json, http::Uri};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;

pub mod admin;
pub mod classes;
pub mod courses;
pub mod documents;
pub mod messages;
pub mod schedules;
pub mod students;
pub mod teachers;
pub mod users;

/// Body of GET /.
#[derive(Debug, Serialize, ToSchema)]
pub struct Welcome {
    pub name: &'static str,
    pub version: &'static str,
    pub docs: &'static str,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses((status = 200, description = "Service banner", body = Welcome))
)]
pub async fn welcome() -> Json<Welcome> {
    Json(Welcome {
        name: "School Management API",
        version: env!("CARGO_PKG_VERSION"),
        docs: "/swagger-ui",
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// Router fallback: unknown routes get the error envelope instead of an empty 404.
pub async fn fallback(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("route {} not found", uri.path()))
}

//! System endpoints: health check and package catalog.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::PackagesResponse;
use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// `GET /api/health` — Service health status.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    summary = "Health check",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "unibaby_pool".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/packages` — Course package catalog.
#[utoipa::path(
    get,
    path = "/api/packages",
    tag = "Packages",
    summary = "List course packages",
    description = "Returns every package in the catalog keyed by package id. Prices are in major currency units.",
    responses(
        (status = 200, description = "Package catalog", body = PackagesResponse),
    )
)]
pub async fn packages_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(PackagesResponse::from(state.enrollment.catalog()))
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/packages", get(packages_handler))
}

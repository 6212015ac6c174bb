//! Registration handlers: create and fetch.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{RegisterResponse, RegistrationDto, RegistrationRequest};
use crate::app_state::AppState;
use crate::domain::RegistrationId;
use crate::error::{ApiError, ErrorResponse};

/// `POST /api/register` — Record a registration without payment.
///
/// # Errors
///
/// Returns [`ApiError`] on an unknown package, blank fields, or a
/// persistence failure.
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "Registrations",
    summary = "Register a child for a package",
    description = "Creates a `pending_payment` registration with a snapshot of the package. Identical requests create independent registrations.",
    request_body = RegistrationRequest,
    responses(
        (status = 200, description = "Registration created", body = RegisterResponse),
        (status = 400, description = "Unknown package or invalid fields", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegistrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (package_id, input) = req.into_parts();
    let registration = state
        .enrollment
        .register_participant(&package_id, input)
        .await?;
    Ok(Json(RegisterResponse::registered(registration.id)))
}

/// `GET /api/registrations/{id}` — Fetch a stored registration.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for a malformed id or
/// [`ApiError::RegistrationNotFound`].
#[utoipa::path(
    get,
    path = "/api/registrations/{id}",
    tag = "Registrations",
    summary = "Get registration",
    params(("id" = String, Path, description = "Registration id (UUID)")),
    responses(
        (status = 200, description = "Registration", body = RegistrationDto),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Registration not found", body = ErrorResponse),
    )
)]
pub async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: RegistrationId = id
        .parse()
        .map_err(|e| ApiError::InvalidRequest(format!("registration id: {e}")))?;
    let registration = state.enrollment.get_registration(id).await?;
    Ok(Json(RegistrationDto::from(registration)))
}

/// Registration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/registrations/{id}", get(get_registration))
}

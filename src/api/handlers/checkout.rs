//! Checkout handlers: open a hosted checkout and poll its status.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CheckoutSessionRequest, CheckoutSessionResponse, CheckoutStatusResponse};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// `POST /api/checkout/session` — Register and open a hosted checkout.
///
/// # Errors
///
/// Returns [`ApiError`] on an unknown or mismatched package, a missing
/// payment credential, or a provider failure.
#[utoipa::path(
    post,
    path = "/api/checkout/session",
    tag = "Checkout",
    summary = "Create checkout session",
    description = "Creates a fresh registration and a hosted checkout for it. Amount and currency come from the catalog, never from the client.",
    request_body = CheckoutSessionRequest,
    responses(
        (status = 200, description = "Checkout opened", body = CheckoutSessionResponse),
        (status = 400, description = "Unknown package or invalid request", body = ErrorResponse),
        (status = 500, description = "Payment gateway not configured", body = ErrorResponse),
        (status = 502, description = "Payment provider failure", body = ErrorResponse),
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CheckoutSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (registration_package, input) = req.registration_data.into_parts();
    let opened = state
        .enrollment
        .start_checkout(&req.package_id, &registration_package, input, &req.origin_url)
        .await?;
    Ok(Json(CheckoutSessionResponse::from(opened)))
}

/// `GET /api/checkout/status/{session_id}` — Live status of a checkout.
///
/// # Errors
///
/// Returns [`ApiError::TransactionNotFound`] for unknown sessions, or
/// [`ApiError`] on a missing credential or provider failure.
#[utoipa::path(
    get,
    path = "/api/checkout/status/{session_id}",
    tag = "Checkout",
    summary = "Get checkout status",
    description = "Reads the provider's live status and reconciles the stored transaction. `amount_total` is in minor currency units.",
    params(("session_id" = String, Path, description = "Provider checkout session id")),
    responses(
        (status = 200, description = "Live checkout status", body = CheckoutStatusResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 500, description = "Payment gateway not configured", body = ErrorResponse),
        (status = 502, description = "Payment provider failure", body = ErrorResponse),
    )
)]
pub async fn checkout_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let live = state.enrollment.refresh_checkout_status(&session_id).await?;
    Ok(Json(CheckoutStatusResponse::from(live)))
}

/// Checkout routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/session", post(create_session))
        .route("/checkout/status/{session_id}", get(checkout_status))
}

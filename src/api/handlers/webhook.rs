//! Payment provider webhook receiver.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::WebhookAck;
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// Header carrying the provider signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// `POST /api/webhook/stripe` — Signed provider event delivery.
///
/// The raw body is verified byte-for-byte, so it is taken as [`Bytes`]
/// rather than parsed JSON.
///
/// # Errors
///
/// Returns [`ApiError::MissingSignature`],
/// [`ApiError::WebhookVerificationFailed`], or
/// [`ApiError::GatewayNotConfigured`].
#[utoipa::path(
    post,
    path = "/api/webhook/stripe",
    tag = "Webhooks",
    summary = "Stripe webhook",
    description = "Accepts a signed `checkout.session.completed` event and settles the matching transaction. Other event types are acknowledged and ignored.",
    request_body(content = String, description = "Raw event JSON", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 500, description = "Payment gateway not configured", body = ErrorResponse),
    )
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    state.enrollment.handle_webhook(&body, signature).await?;
    Ok(Json(WebhookAck::default()))
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhook/stripe", post(stripe_webhook))
}

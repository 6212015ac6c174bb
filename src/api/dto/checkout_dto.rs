//! Checkout DTOs: session creation and status polling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::registration_dto::RegistrationRequest;
use crate::domain::{PaymentStatus, RegistrationId};
use crate::gateway::CheckoutStatus;
use crate::service::OpenedCheckout;

/// Request body for `POST /api/checkout/session`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutSessionRequest {
    /// Package to pay for. Must match `registration_data.package_id`.
    pub package_id: String,
    /// Registration created as part of the checkout.
    pub registration_data: RegistrationRequest,
    /// Origin of the web client, used to build the redirect URLs.
    pub origin_url: String,
}

/// Response body for `POST /api/checkout/session`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSessionResponse {
    /// Hosted checkout page.
    pub checkout_url: String,
    /// Provider session id.
    pub session_id: String,
    /// Registration created for this checkout.
    pub registration_id: RegistrationId,
}

impl From<OpenedCheckout> for CheckoutSessionResponse {
    fn from(c: OpenedCheckout) -> Self {
        Self {
            checkout_url: c.checkout_url,
            session_id: c.session_id,
            registration_id: c.registration_id,
        }
    }
}

/// Response body for `GET /api/checkout/status/{session_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutStatusResponse {
    /// Provider session status (`open`, `complete`, `expired`).
    pub status: String,
    /// Settlement state.
    #[schema(value_type = String, example = "paid")]
    pub payment_status: PaymentStatus,
    /// Total in the currency's minor units, as the provider reports it.
    pub amount_total: i64,
    /// Lower-case ISO 4217 code.
    pub currency: String,
    /// Metadata attached to the session.
    pub metadata: BTreeMap<String, String>,
}

impl From<CheckoutStatus> for CheckoutStatusResponse {
    fn from(s: CheckoutStatus) -> Self {
        Self {
            status: s.status,
            payment_status: s.payment_status,
            amount_total: s.amount_total,
            currency: s.currency,
            metadata: s.metadata,
        }
    }
}

/// Response body for `POST /api/webhook/stripe`.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    /// Always `"success"`.
    pub status: String,
}

impl Default for WebhookAck {
    fn default() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

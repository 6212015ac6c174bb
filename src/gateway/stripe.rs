//! Stripe Checkout adapter.
//!
//! Talks to the Stripe REST API with form-encoded requests and bearer
//! authentication. Sessions are created in `payment` mode with a single
//! inline-priced line item, so the amount always comes from our catalog.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::signature::{self, DEFAULT_TOLERANCE_SECS};
use super::{
    CheckoutGateway, CheckoutRequest, CheckoutSession, CheckoutStatus, PaymentError, WebhookEvent,
    WebhookEventType,
};
use crate::domain::PaymentStatus;

/// Default Stripe API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Currencies Stripe charges in whole units.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

/// Credentials and endpoint for [`StripeGateway`].
#[derive(Debug, Clone)]
pub struct StripeSettings {
    /// Secret API key (`sk_...`).
    pub api_key: SecretString,
    /// Webhook signing secret (`whsec_...`). Without it every webhook is
    /// rejected.
    pub webhook_secret: Option<SecretString>,
    /// API base URL, overridable for tests.
    pub api_base: String,
    /// Accepted webhook age in seconds.
    pub tolerance_secs: i64,
}

impl StripeSettings {
    /// Settings against the live Stripe endpoint.
    #[must_use]
    pub fn new(api_key: SecretString, webhook_secret: Option<SecretString>) -> Self {
        Self {
            api_key,
            webhook_secret,
            api_base: DEFAULT_API_BASE.to_string(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Points the adapter at another base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Stripe implementation of [`CheckoutGateway`].
#[derive(Debug, Clone)]
pub struct StripeGateway {
    settings: StripeSettings,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SessionCreated {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionState {
    status: Option<String>,
    payment_status: String,
    amount_total: Option<i64>,
    currency: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

impl StripeGateway {
    /// Creates an adapter with its own HTTP client.
    #[must_use]
    pub fn new(settings: StripeSettings) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.api_base.trim_end_matches('/'))
    }

    /// Sends a request and decodes a successful JSON body.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PaymentError> {
        let response = request
            .bearer_auth(self.settings.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "stripe rejected request");
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

/// Converts a major-unit amount to the integer minor units Stripe expects.
///
/// # Errors
///
/// Returns [`PaymentError::InvalidRequest`] for negative or oversized
/// amounts.
pub fn to_minor_units(amount: Decimal, currency: &str) -> Result<i64, PaymentError> {
    if amount.is_sign_negative() {
        return Err(PaymentError::InvalidRequest(format!(
            "negative amount {amount}"
        )));
    }
    let scaled = if ZERO_DECIMAL_CURRENCIES.contains(&currency.to_lowercase().as_str()) {
        amount
    } else {
        amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| PaymentError::InvalidRequest(format!("amount {amount} overflows")))?
    };
    scaled
        .round()
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidRequest(format!("amount {amount} overflows")))
}

/// Builds the form body of a session-create call.
fn session_form(request: &CheckoutRequest, unit_amount: i64) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.to_lowercase(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            unit_amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
    ];
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

/// Extracts the domain event from a verified payload.
fn parse_event(payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
    let envelope: EventEnvelope = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::invalid_webhook(format!("invalid payload: {e}")))?;

    let event_type = WebhookEventType::from(envelope.event_type.as_str());
    let object = &envelope.data.object;
    let session_id = object
        .get("id")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let payment_status = object
        .get("payment_status")
        .and_then(serde_json::Value::as_str)
        .map(PaymentStatus::from);

    if event_type == WebhookEventType::CheckoutSessionCompleted && session_id.is_none() {
        return Err(PaymentError::invalid_webhook(
            "checkout event without session id",
        ));
    }

    Ok(WebhookEvent {
        event_id: envelope.id,
        event_type,
        session_id,
        payment_status,
    })
}

#[async_trait]
impl CheckoutGateway for StripeGateway {
    async fn create_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let unit_amount = to_minor_units(request.amount, &request.currency)?;
        let form = session_form(&request, unit_amount);

        let created: SessionCreated = self
            .send(self.http.post(self.url("/v1/checkout/sessions")).form(&form))
            .await?;

        let url = created.url.ok_or_else(|| {
            PaymentError::InvalidResponse(format!("session {} has no url", created.id))
        })?;

        tracing::debug!(session_id = %created.id, "stripe session created");
        Ok(CheckoutSession {
            session_id: created.id,
            url,
        })
    }

    async fn get_status(&self, session_id: &str) -> Result<CheckoutStatus, PaymentError> {
        let state: SessionState = self
            .send(
                self.http
                    .get(self.url(&format!("/v1/checkout/sessions/{session_id}"))),
            )
            .await?;

        Ok(CheckoutStatus {
            status: state.status.unwrap_or_default(),
            payment_status: PaymentStatus::from(state.payment_status),
            amount_total: state.amount_total.unwrap_or_default(),
            currency: state.currency.unwrap_or_default(),
            metadata: state.metadata,
        })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let Some(secret) = self.settings.webhook_secret.as_ref() else {
            return Err(PaymentError::invalid_webhook(
                "webhook signing secret not configured",
            ));
        };

        signature::verify(
            payload,
            signature_header,
            secret.expose_secret(),
            chrono::Utc::now().timestamp(),
            self.settings.tolerance_secs,
        )?;

        let event = parse_event(payload)?;
        tracing::info!(event_id = %event.event_id, event_type = ?event.event_type, "webhook verified");
        Ok(event)
    }
}

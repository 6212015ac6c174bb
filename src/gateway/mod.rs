//! Hosted-checkout gateway: the port the service talks to and its Stripe
//! adapter.
//!
//! [`CheckoutGateway`] covers the three things the service needs from a
//! payment provider: open a checkout session, read its live status, and
//! authenticate + parse a webhook delivery.

pub mod signature;
pub mod stripe;

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::PaymentStatus;

pub use stripe::{StripeGateway, StripeSettings};

/// Provider event type that settles a checkout.
pub const CHECKOUT_COMPLETED_EVENT: &str = "checkout.session.completed";

/// Failure talking to, or authenticating, the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// Provider answered with a non-success status.
    #[error("provider rejected request (status {status}): {body}")]
    Provider {
        /// HTTP status returned by the provider.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Provider answered with something we cannot interpret.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Webhook signature, timestamp, or payload was rejected.
    #[error("{0}")]
    InvalidWebhook(String),

    /// The adapter lacks a credential needed for this call.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Request could not be expressed for the provider.
    #[error("invalid checkout request: {0}")]
    InvalidRequest(String),
}

impl PaymentError {
    /// Shorthand for [`PaymentError::InvalidWebhook`].
    pub fn invalid_webhook(msg: impl Into<String>) -> Self {
        Self::InvalidWebhook(msg.into())
    }
}

/// What to charge and where to send the customer afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Amount in major currency units.
    pub amount: Decimal,
    /// Lower-case ISO 4217 code.
    pub currency: String,
    /// Line-item title shown on the hosted page.
    pub product_name: String,
    /// Redirect after successful payment.
    pub success_url: String,
    /// Redirect when the customer backs out.
    pub cancel_url: String,
    /// Context echoed back by the provider on status reads and webhooks.
    pub metadata: BTreeMap<String, String>,
}

/// A created hosted-checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Provider session id.
    pub session_id: String,
    /// Hosted page the customer is redirected to.
    pub url: String,
}

/// Live state of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStatus {
    /// Session status (`open`, `complete`, `expired`).
    pub status: String,
    /// Settlement state.
    pub payment_status: PaymentStatus,
    /// Charged total in the currency's minor units.
    pub amount_total: i64,
    /// Lower-case ISO 4217 code.
    pub currency: String,
    /// Metadata attached when the session was created.
    pub metadata: BTreeMap<String, String>,
}

/// Kind of a verified webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// `checkout.session.completed`.
    CheckoutSessionCompleted,
    /// Any other event type, accepted and ignored.
    Other(String),
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        if s == CHECKOUT_COMPLETED_EVENT {
            Self::CheckoutSessionCompleted
        } else {
            Self::Other(s.to_string())
        }
    }
}

/// A webhook delivery whose signature has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Provider event id (`evt_...`).
    pub event_id: String,
    /// Event kind.
    pub event_type: WebhookEventType,
    /// Checkout session the event is about, when it concerns one.
    pub session_id: Option<String>,
    /// Settlement state carried by the event, when present.
    pub payment_status: Option<PaymentStatus>,
}

/// Port for hosted-checkout providers.
#[async_trait]
pub trait CheckoutGateway: Send + Sync + std::fmt::Debug {
    /// Opens a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] on transport failure or provider rejection.
    async fn create_session(&self, request: CheckoutRequest)
    -> Result<CheckoutSession, PaymentError>;

    /// Reads the live status of a session.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] on transport failure or provider rejection.
    async fn get_status(&self, session_id: &str) -> Result<CheckoutStatus, PaymentError>;

    /// Authenticates a webhook delivery and parses it.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidWebhook`] if the signature or payload
    /// is rejected.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}

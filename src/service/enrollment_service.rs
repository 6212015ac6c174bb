//! Enrollment service: registration, checkout, and payment reconciliation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    INITIATED_STATUS, NewRegistration, Package, PackageCatalog, PaymentStatus,
    PaymentTransaction, Registration, RegistrationId, RegistrationStatus, TransactionId,
};
use crate::error::ApiError;
use crate::gateway::{
    CheckoutGateway, CheckoutRequest, CheckoutStatus, PaymentError, WebhookEvent, WebhookEventType,
};
use crate::persistence::{RegistrationStore, StatusChange, TransactionStore};

/// Placeholder the provider substitutes with the real session id.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// A checkout session opened for a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedCheckout {
    /// Hosted page to redirect the customer to.
    pub checkout_url: String,
    /// Provider session id.
    pub session_id: String,
    /// Registration being paid for.
    pub registration_id: RegistrationId,
}

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Event type we do not act on.
    Ignored,
    /// Completed checkout for a session we never created.
    UnknownSession,
    /// Transaction updated; `registration_confirmed` tells whether the
    /// registration moved to `confirmed`.
    Applied {
        /// The linked registration advanced to `confirmed`.
        registration_confirmed: bool,
    },
}

/// Orchestration layer for the enrollment use cases.
///
/// Stateless coordinator over the package catalog, the two document
/// collections, and the optional checkout gateway. Registration and
/// transaction writes are separate steps; a failure between them leaves
/// the earlier write in place.
#[derive(Debug, Clone)]
pub struct EnrollmentService {
    catalog: Arc<PackageCatalog>,
    registrations: Arc<dyn RegistrationStore>,
    transactions: Arc<dyn TransactionStore>,
    gateway: Option<Arc<dyn CheckoutGateway>>,
}

impl EnrollmentService {
    /// Creates a new `EnrollmentService`. Pass `None` as `gateway` when no
    /// payment credential is configured.
    #[must_use]
    pub fn new(
        catalog: Arc<PackageCatalog>,
        registrations: Arc<dyn RegistrationStore>,
        transactions: Arc<dyn TransactionStore>,
        gateway: Option<Arc<dyn CheckoutGateway>>,
    ) -> Self {
        Self {
            catalog,
            registrations,
            transactions,
            gateway,
        }
    }

    /// Returns the package catalog.
    #[must_use]
    pub fn catalog(&self) -> &PackageCatalog {
        &self.catalog
    }

    /// Returns `true` if a checkout gateway is configured.
    #[must_use]
    pub fn payments_enabled(&self) -> bool {
        self.gateway.is_some()
    }

    fn gateway(&self) -> Result<&Arc<dyn CheckoutGateway>, ApiError> {
        self.gateway.as_ref().ok_or(ApiError::GatewayNotConfigured)
    }

    fn package(&self, package_id: &str) -> Result<&Package, ApiError> {
        self.catalog
            .get(package_id)
            .ok_or_else(|| ApiError::InvalidPackage(package_id.to_string()))
    }

    /// Records a new `pending_payment` registration for `package_id`.
    ///
    /// Identical input twice creates two independent registrations.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidPackage`] for an unknown package,
    /// [`ApiError::InvalidRequest`] for blank required fields or a child
    /// older than [`MAX_CHILD_AGE`], or a persistence error.
    pub async fn register_participant(
        &self,
        package_id: &str,
        input: NewRegistration,
    ) -> Result<Registration, ApiError> {
        let package = self.package(package_id)?;
        validate_registration(&input)?;

        let registration = Registration::new(input, package);
        self.registrations.insert_registration(&registration).await?;

        tracing::info!(
            registration_id = %registration.id,
            package_id = %registration.package_id,
            "registration created"
        );
        Ok(registration)
    }

    /// Opens a hosted checkout for an existing registration and records a
    /// `pending` transaction.
    ///
    /// Amount and currency come from the registration's package snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::GatewayNotConfigured`] without a gateway,
    /// [`ApiError::InvalidRequest`] for a malformed origin,
    /// [`ApiError::Gateway`] if the provider call fails, or a persistence
    /// error.
    pub async fn open_checkout(
        &self,
        registration: &Registration,
        origin_url: &str,
    ) -> Result<OpenedCheckout, ApiError> {
        let gateway = self.gateway()?;
        let (success_url, cancel_url) = redirect_urls(origin_url)?;
        let package = &registration.package_snapshot;

        let mut metadata = BTreeMap::new();
        metadata.insert("registration_id".to_string(), registration.id.to_string());
        metadata.insert("package_id".to_string(), package.id.clone());
        metadata.insert("child_name".to_string(), registration.child_name.clone());
        metadata.insert("parent_name".to_string(), registration.parent_name.clone());

        let session = gateway
            .create_session(CheckoutRequest {
                amount: package.price,
                currency: package.currency.clone(),
                product_name: package.display_name.clone(),
                success_url,
                cancel_url,
                metadata: metadata.clone(),
            })
            .await?;

        let transaction = PaymentTransaction {
            id: TransactionId::new(),
            provider_session_id: session.session_id.clone(),
            registration_id: registration.id,
            package_id: package.id.clone(),
            amount: package.price,
            currency: package.currency.clone(),
            payment_status: PaymentStatus::Pending,
            status: INITIATED_STATUS.to_string(),
            metadata,
            created_at: Utc::now(),
            updated_at: None,
            event_id: None,
            webhook_processed_at: None,
        };
        self.transactions.insert_transaction(&transaction).await?;

        tracing::info!(
            registration_id = %registration.id,
            session_id = %session.session_id,
            amount = %package.price,
            currency = %package.currency,
            "checkout session opened"
        );

        Ok(OpenedCheckout {
            checkout_url: session.url,
            session_id: session.session_id,
            registration_id: registration.id,
        })
    }

    /// Registers a participant and immediately opens a checkout for them.
    ///
    /// `registration_package_id` is the package named inside the
    /// registration payload; it must exist and equal `package_id`. Every
    /// call creates a fresh registration. Everything that can be validated
    /// up front is checked before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::GatewayNotConfigured`],
    /// [`ApiError::InvalidPackage`] if either package id is unknown,
    /// [`ApiError::InvalidRequest`] if they differ or the origin is
    /// malformed, or any error of [`Self::register_participant`] /
    /// [`Self::open_checkout`].
    pub async fn start_checkout(
        &self,
        package_id: &str,
        registration_package_id: &str,
        input: NewRegistration,
        origin_url: &str,
    ) -> Result<OpenedCheckout, ApiError> {
        self.gateway()?;
        self.package(package_id)?;
        self.package(registration_package_id)?;
        if registration_package_id != package_id {
            return Err(ApiError::InvalidRequest(format!(
                "registration_data.package_id {registration_package_id} does not match package_id {package_id}"
            )));
        }
        validate_registration(&input)?;
        redirect_urls(origin_url)?;

        let registration = self.register_participant(package_id, input).await?;
        self.open_checkout(&registration, origin_url).await
    }

    /// Reads the live provider status of a session and reconciles the
    /// stored transaction.
    ///
    /// The transaction is rewritten only when the provider's payment status
    /// differs from the stored one; a new `paid` also advances the linked
    /// registration to `paid`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::GatewayNotConfigured`],
    /// [`ApiError::TransactionNotFound`] for unknown sessions,
    /// [`ApiError::Gateway`] on provider failure, or a persistence error.
    pub async fn refresh_checkout_status(&self, session_id: &str) -> Result<CheckoutStatus, ApiError> {
        let gateway = self.gateway()?;

        let Some(transaction) = self.transactions.find_by_session(session_id).await? else {
            return Err(ApiError::TransactionNotFound(session_id.to_string()));
        };

        let live = gateway.get_status(session_id).await?;

        if transaction.payment_status != live.payment_status {
            let now = Utc::now();
            self.transactions
                .update_polled_status(session_id, &live.payment_status, &live.status, now)
                .await?;
            tracing::info!(
                session_id,
                from = %transaction.payment_status,
                to = %live.payment_status,
                "payment status changed"
            );

            if live.payment_status.is_paid() {
                self.advance_registration(transaction.registration_id, RegistrationStatus::Paid)
                    .await?;
            }
        }

        Ok(live)
    }

    /// Authenticates and applies a provider webhook.
    ///
    /// Every failure after the signature-presence check is reported as
    /// [`ApiError::WebhookVerificationFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingSignature`] when `signature` is absent,
    /// [`ApiError::GatewayNotConfigured`] without a gateway, or
    /// [`ApiError::WebhookVerificationFailed`].
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, ApiError> {
        let Some(signature) = signature else {
            return Err(ApiError::MissingSignature);
        };
        let gateway = self.gateway()?;

        let event = gateway
            .verify_webhook(payload, signature)
            .await
            .map_err(|e: PaymentError| {
                tracing::warn!(error = %e, "webhook rejected");
                ApiError::WebhookVerificationFailed(e.to_string())
            })?;

        self.apply_webhook(event).await.map_err(|e| {
            tracing::error!(error = %e, "webhook processing failed");
            let reason = match e {
                ApiError::WebhookVerificationFailed(msg) => msg,
                other => other.to_string(),
            };
            ApiError::WebhookVerificationFailed(reason)
        })
    }

    async fn apply_webhook(
        &self,
        event: WebhookEvent,
    ) -> Result<WebhookOutcome, ApiError> {
        if event.event_type != WebhookEventType::CheckoutSessionCompleted {
            tracing::debug!(event_id = %event.event_id, event_type = ?event.event_type, "webhook ignored");
            return Ok(WebhookOutcome::Ignored);
        }

        let Some(session_id) = event.session_id.as_deref() else {
            return Err(ApiError::WebhookVerificationFailed(
                "checkout event without session id".to_string(),
            ));
        };
        let payment_status = event.payment_status.clone().unwrap_or(PaymentStatus::Pending);

        let updated = self
            .transactions
            .record_webhook(session_id, &payment_status, &event.event_id, Utc::now())
            .await?;
        let Some(transaction) = updated else {
            tracing::warn!(session_id, event_id = %event.event_id, "webhook for unknown session");
            return Ok(WebhookOutcome::UnknownSession);
        };

        let mut registration_confirmed = false;
        if payment_status.is_paid() {
            registration_confirmed = self
                .advance_registration(transaction.registration_id, RegistrationStatus::Confirmed)
                .await?;
        }

        tracing::info!(
            session_id,
            event_id = %event.event_id,
            payment_status = %payment_status,
            registration_confirmed,
            "webhook applied"
        );
        Ok(WebhookOutcome::Applied {
            registration_confirmed,
        })
    }

    /// Moves a registration forward, logging when nothing changes.
    async fn advance_registration(
        &self,
        id: RegistrationId,
        status: RegistrationStatus,
    ) -> Result<bool, ApiError> {
        match self
            .registrations
            .advance_registration_status(id, status, Utc::now())
            .await?
        {
            StatusChange::Advanced => {
                tracing::info!(registration_id = %id, %status, "registration advanced");
                Ok(true)
            }
            StatusChange::Unchanged(current) => {
                tracing::warn!(registration_id = %id, %current, requested = %status, "backward status change skipped");
                Ok(false)
            }
            StatusChange::NotFound => {
                tracing::warn!(registration_id = %id, "transaction references missing registration");
                Ok(false)
            }
        }
    }

    /// Fetches a registration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RegistrationNotFound`] or a persistence error.
    pub async fn get_registration(&self, id: RegistrationId) -> Result<Registration, ApiError> {
        self.registrations
            .find_registration(id)
            .await?
            .ok_or_else(|| ApiError::RegistrationNotFound(id.to_string()))
    }
}

/// Oldest child the pool accepts.
pub const MAX_CHILD_AGE: u32 = 18;

fn validate_registration(input: &NewRegistration) -> Result<(), ApiError> {
    for (field, value) in [
        ("parent_name", &input.parent_name),
        ("phone", &input.phone),
        ("child_name", &input.child_name),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::InvalidRequest(format!("{field} must not be empty")));
        }
    }
    if input.child_age > MAX_CHILD_AGE {
        return Err(ApiError::InvalidRequest(format!(
            "child_age must be at most {MAX_CHILD_AGE}, got {}",
            input.child_age
        )));
    }
    Ok(())
}

/// Builds the success and cancel redirect URLs from the caller's origin.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] unless `origin_url` is an
/// `http(s)://` URL.
pub fn redirect_urls(origin_url: &str) -> Result<(String, String), ApiError> {
    let origin = origin_url.trim().trim_end_matches('/');
    let host = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"));
    if host.is_none_or(str::is_empty) {
        return Err(ApiError::InvalidRequest(format!(
            "origin_url must be an http(s) URL: {origin_url}"
        )));
    }
    Ok((
        format!("{origin}/success?session_id={SESSION_ID_PLACEHOLDER}"),
        format!("{origin}/"),
    ))
}

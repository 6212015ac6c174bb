//! Persistence layer: registration and payment-transaction documents.
//!
//! Two collections with insert / find / update-by-filter semantics and no
//! cross-collection transactions. [`MemoryStore`] keeps everything in
//! process; [`PostgresStore`] uses `sqlx::PgPool`.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{PaymentStatus, PaymentTransaction, Registration, RegistrationId, RegistrationStatus};
use crate::error::ApiError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Outcome of a forward-only status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The status moved forward.
    Advanced,
    /// The registration was already at or beyond the target.
    Unchanged(RegistrationStatus),
    /// No registration has that id.
    NotFound,
}

/// Registration collection.
#[async_trait]
pub trait RegistrationStore: Send + Sync + std::fmt::Debug {
    /// Persists a new registration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::PersistenceError`] on storage failure.
    async fn insert_registration(&self, registration: &Registration) -> Result<(), ApiError>;

    /// Fetches a registration by id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::PersistenceError`] on storage failure.
    async fn find_registration(
        &self,
        id: RegistrationId,
    ) -> Result<Option<Registration>, ApiError>;

    /// Moves a registration to `status` if that is a forward step, stamping
    /// `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::PersistenceError`] on storage failure.
    async fn advance_registration_status(
        &self,
        id: RegistrationId,
        status: RegistrationStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, ApiError>;
}

/// Payment-transaction collection, looked up by provider session id.
#[async_trait]
pub trait TransactionStore: Send + Sync + std::fmt::Debug {
    /// Persists a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::PersistenceError`] on storage failure, including a
    /// duplicate session id.
    async fn insert_transaction(&self, transaction: &PaymentTransaction) -> Result<(), ApiError>;

    /// Fetches the transaction of a checkout session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::PersistenceError`] on storage failure.
    async fn find_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<PaymentTransaction>, ApiError>;

    /// Overwrites `payment_status`, `status` and `updated_at` after a status
    /// poll. Returns `false` if no transaction matches.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::PersistenceError`] on storage failure.
    async fn update_polled_status(
        &self,
        session_id: &str,
        payment_status: &PaymentStatus,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, ApiError>;

    /// Overwrites `payment_status` and records the webhook event, returning
    /// the updated transaction if one matches.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::PersistenceError`] on storage failure.
    async fn record_webhook(
        &self,
        session_id: &str,
        payment_status: &PaymentStatus,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<PaymentTransaction>, ApiError>;
}

//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

use super::models::{RegistrationRow, TransactionRow};
use super::{RegistrationStore, StatusChange, TransactionStore};
use crate::config::AppConfig;
use crate::domain::{
    PaymentStatus, PaymentTransaction, Registration, RegistrationId, RegistrationStatus,
};
use crate::error::ApiError;

const REGISTRATION_COLUMNS: &str = "id, parent_name, phone, child_name, child_age, package_id, \
     package_snapshot, email, notes, created_at, updated_at, status";

const TRANSACTION_COLUMNS: &str = "id, session_id, registration_id, package_id, amount, currency, \
     payment_status, status, metadata, created_at, updated_at, event_id, webhook_processed_at";

fn db_error(e: sqlx::Error) -> ApiError {
    ApiError::PersistenceError(e.to_string())
}

/// Stored statuses a registration may move to `target` from.
fn statuses_behind(target: RegistrationStatus) -> Vec<&'static str> {
    [
        RegistrationStatus::PendingPayment,
        RegistrationStatus::Paid,
        RegistrationStatus::Confirmed,
    ]
    .into_iter()
    .filter(|s| s.can_advance_to(target))
    .map(|s| s.as_str())
    .collect()
}

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store on an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] if the database is
    /// unreachable.
    pub async fn connect(config: &AppConfig) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(db_error)?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), ApiError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::PersistenceError(e.to_string()))
    }

    async fn registration_status(
        &self,
        id: RegistrationId,
    ) -> Result<Option<RegistrationStatus>, ApiError> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM registrations WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        status
            .map(|s| s.parse().map_err(ApiError::PersistenceError))
            .transpose()
    }
}

#[async_trait]
impl RegistrationStore for PostgresStore {
    async fn insert_registration(&self, registration: &Registration) -> Result<(), ApiError> {
        let child_age = i32::try_from(registration.child_age)
            .map_err(|e| ApiError::InvalidRequest(format!("child_age: {e}")))?;

        sqlx::query(
            "INSERT INTO registrations (id, parent_name, phone, child_name, child_age, package_id, \
             package_snapshot, email, notes, created_at, updated_at, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(registration.id.as_uuid())
        .bind(&registration.parent_name)
        .bind(&registration.phone)
        .bind(&registration.child_name)
        .bind(child_age)
        .bind(&registration.package_id)
        .bind(Json(&registration.package_snapshot))
        .bind(&registration.email)
        .bind(&registration.notes)
        .bind(registration.created_at)
        .bind(registration.updated_at)
        .bind(registration.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_registration(
        &self,
        id: RegistrationId,
    ) -> Result<Option<Registration>, ApiError> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Registration::try_from).transpose()
    }

    async fn advance_registration_status(
        &self,
        id: RegistrationId,
        status: RegistrationStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, ApiError> {
        let result = sqlx::query(
            "UPDATE registrations SET status = $2, updated_at = $3 \
             WHERE id = $1 AND status = ANY($4)",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(at)
        .bind(statuses_behind(status))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() > 0 {
            return Ok(StatusChange::Advanced);
        }

        Ok(match self.registration_status(id).await? {
            Some(current) => StatusChange::Unchanged(current),
            None => StatusChange::NotFound,
        })
    }
}

#[async_trait]
impl TransactionStore for PostgresStore {
    async fn insert_transaction(&self, transaction: &PaymentTransaction) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO payment_transactions (id, session_id, registration_id, package_id, amount, \
             currency, payment_status, status, metadata, created_at, updated_at, event_id, \
             webhook_processed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(transaction.id.as_uuid())
        .bind(&transaction.provider_session_id)
        .bind(transaction.registration_id.as_uuid())
        .bind(&transaction.package_id)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.payment_status.as_str())
        .bind(&transaction.status)
        .bind(Json(&transaction.metadata))
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .bind(&transaction.event_id)
        .bind(transaction.webhook_processed_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<PaymentTransaction>, ApiError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM payment_transactions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(PaymentTransaction::from))
    }

    async fn update_polled_status(
        &self,
        session_id: &str,
        payment_status: &PaymentStatus,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE payment_transactions SET payment_status = $2, status = $3, updated_at = $4 \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(payment_status.as_str())
        .bind(status)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_webhook(
        &self,
        session_id: &str,
        payment_status: &PaymentStatus,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<PaymentTransaction>, ApiError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "UPDATE payment_transactions \
             SET payment_status = $2, event_id = $3, webhook_processed_at = $4 \
             WHERE session_id = $1 RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(session_id)
        .bind(payment_status.as_str())
        .bind(event_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(PaymentTransaction::from))
    }
}

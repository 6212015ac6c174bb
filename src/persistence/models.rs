//! Database rows for the `registrations` and `payment_transactions` tables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{
    Package, PaymentStatus, PaymentTransaction, Registration, RegistrationId, TransactionId,
};
use crate::error::ApiError;

/// A row of the `registrations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegistrationRow {
    /// Primary key.
    pub id: Uuid,
    /// Parent's full name.
    pub parent_name: String,
    /// Contact phone number.
    pub phone: String,
    /// Child's name.
    pub child_name: String,
    /// Child's age in years.
    pub child_age: i32,
    /// Catalog key.
    pub package_id: String,
    /// Package as offered at registration time (JSONB).
    pub package_snapshot: Json<Package>,
    /// Optional e-mail.
    pub email: Option<String>,
    /// Optional notes.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: Option<DateTime<Utc>>,
    /// Lifecycle status string.
    pub status: String,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = ApiError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RegistrationId::from_uuid(row.id),
            parent_name: row.parent_name,
            phone: row.phone,
            child_name: row.child_name,
            child_age: u32::try_from(row.child_age)
                .map_err(|e| ApiError::PersistenceError(format!("child_age: {e}")))?,
            package_id: row.package_id,
            package_snapshot: row.package_snapshot.0,
            email: row.email,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            status: row.status.parse().map_err(ApiError::PersistenceError)?,
        })
    }
}

/// A row of the `payment_transactions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    /// Primary key.
    pub id: Uuid,
    /// Provider checkout session id (unique).
    pub session_id: String,
    /// Referenced registration.
    pub registration_id: Uuid,
    /// Catalog key.
    pub package_id: String,
    /// Amount in major units.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Settlement state string.
    pub payment_status: String,
    /// Provider session status.
    pub status: String,
    /// Metadata sent to the provider (JSONB).
    pub metadata: Json<BTreeMap<String, String>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last poll update.
    pub updated_at: Option<DateTime<Utc>>,
    /// Last applied webhook event.
    pub event_id: Option<String>,
    /// When the last webhook event was applied.
    pub webhook_processed_at: Option<DateTime<Utc>>,
}

impl From<TransactionRow> for PaymentTransaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: TransactionId::from_uuid(row.id),
            provider_session_id: row.session_id,
            registration_id: RegistrationId::from_uuid(row.registration_id),
            package_id: row.package_id,
            amount: row.amount,
            currency: row.currency,
            payment_status: PaymentStatus::from(row.payment_status),
            status: row.status,
            metadata: row.metadata.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            event_id: row.event_id,
            webhook_processed_at: row.webhook_processed_at,
        }
    }
}

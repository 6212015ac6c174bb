//! Checkout attempts and their settlement state.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{RegistrationId, TransactionId};

/// Settlement state of a checkout as reported by the provider.
///
/// `Pending` is our own initial value. The remaining variants mirror the
/// provider; anything it reports that we do not know is kept verbatim in
/// [`PaymentStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    /// No outcome known yet.
    Pending,
    /// Funds captured.
    Paid,
    /// Checkout open or abandoned without payment.
    Unpaid,
    /// Nothing was due (e.g. fully discounted).
    NoPaymentRequired,
    /// Provider-defined status we do not interpret.
    Other(String),
}

impl PaymentStatus {
    /// Wire/storage representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::NoPaymentRequired => "no_payment_required",
            Self::Other(s) => s,
        }
    }

    /// Returns `true` for [`PaymentStatus::Paid`].
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "paid" => Self::Paid,
            "unpaid" => Self::Unpaid,
            "no_payment_required" => Self::NoPaymentRequired,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for PaymentStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session status stored on a freshly created transaction.
pub const INITIATED_STATUS: &str = "initiated";

/// One checkout attempt for a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Generated identifier.
    pub id: TransactionId,
    /// Provider's checkout session id. Unique.
    pub provider_session_id: String,
    /// Registration this checkout pays for.
    pub registration_id: RegistrationId,
    /// Catalog key of the purchased package.
    pub package_id: String,
    /// Charged amount in major currency units.
    pub amount: Decimal,
    /// Lower-case ISO 4217 code.
    pub currency: String,
    /// Settlement state.
    pub payment_status: PaymentStatus,
    /// Provider session status (`initiated` until first observed).
    pub status: String,
    /// Context sent to the provider with the session.
    pub metadata: BTreeMap<String, String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status-poll update.
    pub updated_at: Option<DateTime<Utc>>,
    /// Id of the last webhook event applied.
    pub event_id: Option<String>,
    /// When the last webhook event was applied.
    pub webhook_processed_at: Option<DateTime<Utc>>,
}

//! Parent/child enrollment records and their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::RegistrationId;
use super::package::Package;

/// Lifecycle of a registration.
///
/// Ordered: `PendingPayment < Paid < Confirmed`. Stores only ever move a
/// registration forward along this order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Created, no payment observed yet.
    PendingPayment,
    /// Provider reported the checkout as paid when polled.
    Paid,
    /// Provider confirmed the payment through a webhook.
    Confirmed,
}

impl RegistrationStatus {
    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Confirmed => "confirmed",
        }
    }

    /// Returns `true` if moving to `next` does not go backwards.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        next > self
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(Self::PendingPayment),
            "paid" => Ok(Self::Paid),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(format!("unknown registration status: {other}")),
        }
    }
}

/// Validated input for a new registration.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    /// Parent's full name.
    pub parent_name: String,
    /// Contact phone number.
    pub phone: String,
    /// Child's name.
    pub child_name: String,
    /// Child's age in years.
    pub child_age: u32,
    /// Optional contact e-mail.
    pub email: Option<String>,
    /// Free-form notes from the parent.
    pub notes: Option<String>,
}

/// A parent's enrollment request for a child into a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Generated identifier.
    pub id: RegistrationId,
    /// Parent's full name.
    pub parent_name: String,
    /// Contact phone number.
    pub phone: String,
    /// Child's name.
    pub child_name: String,
    /// Child's age in years.
    pub child_age: u32,
    /// Catalog key of the chosen package.
    pub package_id: String,
    /// The package exactly as offered when the registration was made.
    pub package_snapshot: Package,
    /// Optional contact e-mail.
    pub email: Option<String>,
    /// Free-form notes from the parent.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change, if any.
    pub updated_at: Option<DateTime<Utc>>,
    /// Current lifecycle state.
    pub status: RegistrationStatus,
}

impl Registration {
    /// Creates a `pending_payment` registration for `package`, snapshotting
    /// its current data.
    #[must_use]
    pub fn new(input: NewRegistration, package: &Package) -> Self {
        Self {
            id: RegistrationId::new(),
            parent_name: input.parent_name,
            phone: input.phone,
            child_name: input.child_name,
            child_age: input.child_age,
            package_id: package.id.clone(),
            package_snapshot: package.clone(),
            email: input.email,
            notes: input.notes,
            created_at: Utc::now(),
            updated_at: None,
            status: RegistrationStatus::PendingPayment,
        }
    }
}

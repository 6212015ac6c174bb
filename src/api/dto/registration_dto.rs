//! Registration request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::package_dto::PackageDto;
use crate::domain::{NewRegistration, Registration, RegistrationId, RegistrationStatus};

/// Parent/child details plus the chosen package.
///
/// Body of `POST /api/register`, and the `registration_data` of a checkout
/// request. Accepts the legacy field names `name` and `additional_info`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegistrationRequest {
    /// Parent or guardian name.
    #[serde(alias = "name")]
    pub parent_name: String,
    /// Contact phone.
    pub phone: String,
    /// Child's name.
    pub child_name: String,
    /// Child's age in years.
    #[schema(maximum = 18)]
    pub child_age: u32,
    /// Catalog package id.
    pub package_id: String,
    /// Contact e-mail.
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form notes.
    #[serde(default, alias = "additional_info")]
    pub notes: Option<String>,
}

impl RegistrationRequest {
    /// Splits the request into the package id and the registration fields.
    #[must_use]
    pub fn into_parts(self) -> (String, NewRegistration) {
        let input = NewRegistration {
            parent_name: self.parent_name,
            phone: self.phone,
            child_name: self.child_name,
            child_age: self.child_age,
            email: self.email,
            notes: self.notes,
        };
        (self.package_id, input)
    }
}

/// Response body for `POST /api/register`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    /// New registration id.
    pub registration_id: RegistrationId,
    /// Always `"registered"`.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
}

impl RegisterResponse {
    /// Response for a freshly created registration.
    #[must_use]
    pub fn registered(registration_id: RegistrationId) -> Self {
        Self {
            registration_id,
            status: "registered".to_string(),
            message: "Registration successful".to_string(),
        }
    }
}

/// Stored registration, for `GET /api/registrations/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationDto {
    /// Registration id.
    pub id: RegistrationId,
    /// Parent or guardian name.
    pub parent_name: String,
    /// Contact phone.
    pub phone: String,
    /// Child's name.
    pub child_name: String,
    /// Child's age in years.
    pub child_age: u32,
    /// Catalog package id.
    pub package_id: String,
    /// Package as it was when the registration was made.
    pub package: PackageDto,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: RegistrationStatus,
}

impl From<Registration> for RegistrationDto {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            package: PackageDto::from(&r.package_snapshot),
            parent_name: r.parent_name,
            phone: r.phone,
            child_name: r.child_name,
            child_age: r.child_age,
            package_id: r.package_id,
            email: r.email,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
            status: r.status,
        }
    }
}

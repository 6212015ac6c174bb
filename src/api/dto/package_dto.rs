//! Package catalog DTOs.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Package, PackageCatalog};

/// One course package as shown to the web client.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PackageDto {
    /// Catalog key.
    pub id: String,
    /// Display title.
    pub name: String,
    /// Price in major currency units, as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    /// Lower-case ISO 4217 code.
    pub currency: String,
    /// Number of lessons included.
    pub sessions: u32,
}

impl From<&Package> for PackageDto {
    fn from(p: &Package) -> Self {
        Self {
            id: p.id.clone(),
            name: p.display_name.clone(),
            price: p.price,
            currency: p.currency.clone(),
            sessions: p.session_count,
        }
    }
}

/// Response body for `GET /api/packages`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PackagesResponse {
    /// Packages keyed by id.
    pub packages: BTreeMap<String, PackageDto>,
}

impl From<&PackageCatalog> for PackagesResponse {
    fn from(catalog: &PackageCatalog) -> Self {
        Self {
            packages: catalog
                .list()
                .iter()
                .map(|(id, p)| (id.clone(), PackageDto::from(p)))
                .collect(),
        }
    }
}

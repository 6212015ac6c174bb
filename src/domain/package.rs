//! Course packages and the immutable catalog that holds them.
//!
//! The catalog is built once at startup (built-in defaults or a JSON file)
//! and shared read-only behind an `Arc`. There is no mutation path.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A fixed-price swimming course offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Catalog key, e.g. `"junior_swim"`.
    pub id: String,
    /// Human-readable title shown to parents.
    pub display_name: String,
    /// Price in major currency units.
    pub price: Decimal,
    /// Lower-case ISO 4217 code, e.g. `"kzt"`.
    pub currency: String,
    /// Number of lessons included.
    pub session_count: u32,
}

impl Package {
    fn new(id: &str, display_name: &str, price: Decimal, currency: &str, sessions: u32) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            price,
            currency: currency.to_string(),
            session_count: sessions,
        }
    }
}

/// Entry of a catalog file. The key of the surrounding JSON object is the
/// package id.
#[derive(Debug, Deserialize)]
struct PackageFileEntry {
    name: String,
    price: Decimal,
    currency: String,
    sessions: u32,
}

/// Immutable mapping from package id to [`Package`].
#[derive(Debug, Clone)]
pub struct PackageCatalog {
    packages: BTreeMap<String, Package>,
}

impl PackageCatalog {
    /// Builds a catalog from a list of packages. Later duplicates win.
    #[must_use]
    pub fn new(packages: impl IntoIterator<Item = Package>) -> Self {
        Self {
            packages: packages.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// The pool's standard offer, priced in tenge.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new([
            Package::new("baby_splash", "Baby Splash (0-2 года)", dec!(15000), "kzt", 8),
            Package::new("junior_swim", "Junior Swim (3-5 лет)", dec!(18000), "kzt", 8),
            Package::new("aqua_kids", "Aqua Kids (6-12 лет)", dec!(20000), "kzt", 8),
            Package::new("individual", "Индивидуальные занятия", dec!(8000), "kzt", 1),
        ])
    }

    /// Parses a catalog from JSON of the form
    /// `{"<id>": {"name", "price", "currency", "sessions"}}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if the JSON is malformed, empty, or
    /// contains a non-positive price.
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        let entries: BTreeMap<String, PackageFileEntry> = serde_json::from_str(json)
            .map_err(|e| ApiError::Internal(format!("invalid package catalog: {e}")))?;
        if entries.is_empty() {
            return Err(ApiError::Internal("package catalog is empty".to_string()));
        }
        let mut packages = Vec::with_capacity(entries.len());
        for (id, entry) in entries {
            if entry.price <= Decimal::ZERO {
                return Err(ApiError::Internal(format!(
                    "package {id} must have a positive price"
                )));
            }
            packages.push(Package {
                id,
                display_name: entry.name,
                price: entry.price,
                currency: entry.currency.to_lowercase(),
                session_count: entry.sessions,
            });
        }
        Ok(Self::new(packages))
    }

    /// Loads a catalog file, see [`PackageCatalog::from_json`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, ApiError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ApiError::Internal(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Looks up a package by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Package> {
        self.packages.get(id)
    }

    /// Returns every package keyed by id.
    #[must_use]
    pub fn list(&self) -> &BTreeMap<String, Package> {
        &self.packages
    }

    /// Number of packages on offer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns `true` if the catalog offers nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Default for PackageCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

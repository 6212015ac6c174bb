//! Domain layer: packages, registrations, and payment transactions.
//!
//! Plain data types with no I/O. Persistence lives in
//! [`crate::persistence`], provider access in [`crate::gateway`].

pub mod ids;
pub mod package;
pub mod registration;
pub mod transaction;

pub use ids::{RegistrationId, TransactionId};
pub use package::{Package, PackageCatalog};
pub use registration::{NewRegistration, Registration, RegistrationStatus};
pub use transaction::{INITIATED_STATUS, PaymentStatus, PaymentTransaction};

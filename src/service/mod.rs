//! Service layer: business logic orchestration.
//!
//! [`EnrollmentService`] composes the package catalog, the document stores
//! and the checkout gateway into the registration and payment use cases.

pub mod enrollment_service;

pub use enrollment_service::{EnrollmentService, OpenedCheckout, WebhookOutcome, redirect_urls};

//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::EnrollmentService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Enrollment service for all business logic.
    pub enrollment: Arc<EnrollmentService>,
}

impl AppState {
    /// Wraps a service into handler state.
    #[must_use]
    pub fn new(enrollment: EnrollmentService) -> Self {
        Self {
            enrollment: Arc::new(enrollment),
        }
    }
}

//! REST endpoint handlers organized by resource.

pub mod checkout;
pub mod registration;
pub mod system;
pub mod webhook;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(system::routes())
        .merge(registration::routes())
        .merge(checkout::routes())
        .merge(webhook::routes())
}

//! # unibaby-pool
//!
//! Registration and payment backend for the UniBaby children's swimming
//! pool.
//!
//! Parents pick a fixed-price course package, register their child, and
//! pay through a hosted Stripe checkout. Payment completion is reconciled
//! both by client-side status polling and by signed provider webhooks.
//!
//! ## Architecture
//!
//! ```text
//! Clients (web app, Stripe webhooks)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── EnrollmentService (service/)
//!     │       │
//!     │       ├── PackageCatalog (domain/)
//!     │       └── CheckoutGateway ── Stripe (gateway/)
//!     │
//!     └── RegistrationStore / TransactionStore (persistence/)
//!             ├── PostgreSQL
//!             └── in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod persistence;
pub mod service;

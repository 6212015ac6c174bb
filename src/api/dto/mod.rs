//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names follow the existing web client; prices go out as JSON
//! numbers.

pub mod checkout_dto;
pub mod package_dto;
pub mod registration_dto;

pub use checkout_dto::*;
pub use package_dto::*;
pub use registration_dto::*;

//! # API Shared
//!
//! Wire types for the patchlist HTTP API.
//!
//! Contains:
//! - Request and response bodies (`models`), with OpenAPI schemas
//! - The shared `HealthService`
//!
//! These types carry plain strings and numbers only; conversion from core types happens in
//! `api-rest`, so clients can depend on this crate without pulling in the core.

pub mod health;
pub mod models;

pub use health::HealthService;
pub use models::*;

//! HTTP API
//!
//! - [`health`] - service and backend health
//! - [`orders`] - order CRUD and listing

pub mod health;
pub mod orders;

pub use crate::utils::AppResult;

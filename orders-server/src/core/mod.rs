//! Core module: configuration, shared state, server and startup errors
//!
//! - [`Config`] - environment-driven settings
//! - [`ServerState`] - state shared by request handlers
//! - [`Server`] - HTTP server
//! - [`ServerError`] - startup and serving failures

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::{BackendKind, Config};
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;

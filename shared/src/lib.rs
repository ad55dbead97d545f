//! Shared types for the orders service
//!
//! Order records, lifecycle rules and pagination shapes used by both the
//! storage layer and the HTTP API.

pub mod order;
pub mod util;

// Re-exports
pub use order::{
    CURSOR_START, DEFAULT_PAGE_SIZE, LineItem, Order, OrderPage, OrderStatus, PageRequest,
    StatusTransition, TransitionError,
};
pub use serde::{Deserialize, Serialize};

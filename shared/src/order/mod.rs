//! Order Module
//!
//! This module provides the order entity and its companions:
//! - Types: the persisted order record and its line items
//! - Status: lifecycle stages and allowed status changes
//! - Page: cursor-based enumeration shapes

pub mod page;
pub mod status;
pub mod types;

// Re-exports
pub use page::{CURSOR_START, DEFAULT_PAGE_SIZE, OrderPage, PageRequest};
pub use status::{OrderStatus, StatusTransition, TransitionError};
pub use types::{LineItem, Order};

//! Pagination shapes for order enumeration

use serde::{Deserialize, Serialize};

use super::Order;

/// Cursor value that both starts an enumeration and marks its end
pub const CURSOR_START: u64 = 0;

/// Default number of orders requested per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One enumeration step
///
/// `count` is a hint, not a hard limit: a page may hold more or fewer orders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: u64,
    pub count: usize,
}

impl PageRequest {
    pub fn new(cursor: u64, count: usize) -> Self {
        Self { cursor, count }
    }

    /// First page with the given count hint
    pub fn first(count: usize) -> Self {
        Self::new(CURSOR_START, count)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// Result of one enumeration step
///
/// A `cursor` equal to [`CURSOR_START`] means the enumeration is complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub cursor: u64,
}

impl OrderPage {
    /// Terminal page with no orders
    pub fn empty() -> Self {
        Self {
            orders: Vec::new(),
            cursor: CURSOR_START,
        }
    }
}

//! Key layout
//!
//! Each order lives under `order:<id>`; the same string is the member kept
//! in the `orders` index set.

/// Prefix of every order key
pub const ORDER_KEY_PREFIX: &str = "order:";

/// Name of the set indexing every stored order key
pub const ORDER_INDEX_SET: &str = "orders";

/// Derived key for an order id
pub fn order_key(order_id: u64) -> String {
    format!("{ORDER_KEY_PREFIX}{order_id}")
}

/// Order id encoded in a derived key, if it is one
pub fn parse_order_key(key: &str) -> Option<u64> {
    key.strip_prefix(ORDER_KEY_PREFIX)?.parse().ok()
}

//! Order Storage Module
//!
//! Persists orders in a key-value backend that has no secondary indexes:
//!
//! - **keys**: derived key layout (`order:<id>`, index set `orders`)
//! - **store**: [`OrderStore`] insert / get / update / delete / paginated listing
//! - **context**: per-operation cancellation and deadlines
//! - **error**: error classes surfaced to callers
//!
//! # Architecture
//!
//! ```text
//! HTTP handler → OrderStore → KvBackend (memory | redb)
//!                    │
//!                    ├─ primary mapping: order:<id> → JSON
//!                    └─ index set "orders": { order:<id>, ... }
//! ```

pub mod context;
pub mod error;
pub mod keys;
pub mod store;

// Re-exports
pub use context::OpContext;
pub use error::{ErrorKind, StoreError, StoreResult};
pub use keys::{ORDER_INDEX_SET, order_key, parse_order_key};
pub use store::OrderStore;

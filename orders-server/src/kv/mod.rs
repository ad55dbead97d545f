//! Key-Value Backend Module
//!
//! The storage layer only relies on the primitives below, so any store that
//! offers single-key conditional writes, sets with incremental scanning and
//! atomic multi-command batches can back it:
//!
//! - **memory**: in-process backend (tests, ephemeral deployments)
//! - **embedded**: persistent backend on redb
//!
//! # Contract
//!
//! | Operation | Result |
//! |-----------|--------|
//! | `get` | value or `None` |
//! | `set_if_absent` / `set_if_present` | whether the condition held (and the write happened) |
//! | `delete` | whether the key existed |
//! | `add_to_set` / `remove_from_set` | whether membership changed |
//! | `scan_set` | members from the cursor on, plus the next cursor (`0` = done) |
//! | `multi_get` | values aligned with the input keys |
//! | `commit` | all commands applied, or none (see [`batch`]) |

pub mod batch;
pub mod embedded;
pub mod error;
pub mod memory;
pub mod scan;

pub use batch::{Batch, BatchOutcome, Command};
pub use embedded::RedbBackend;
pub use error::{KvError, KvResult};
pub use memory::MemoryBackend;
pub use scan::{ScanPage, slot_of};

use async_trait::async_trait;

/// Key-value backend shared by all request tasks
#[async_trait]
pub trait KvBackend: Send + Sync + 'static {
    /// Backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Cheap round trip used by health checks
    async fn ping(&self) -> KvResult<()>;

    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>>;

    async fn set_if_absent(&self, key: &str, value: &[u8]) -> KvResult<bool>;

    async fn set_if_present(&self, key: &str, value: &[u8]) -> KvResult<bool>;

    async fn delete(&self, key: &str) -> KvResult<bool>;

    async fn add_to_set(&self, set: &str, member: &str) -> KvResult<bool>;

    async fn remove_from_set(&self, set: &str, member: &str) -> KvResult<bool>;

    /// One incremental step over `set`
    ///
    /// Not snapshot isolated: members added or removed while a cycle is in
    /// progress may or may not show up. `count` is a hint.
    async fn scan_set(&self, set: &str, cursor: u64, count: usize) -> KvResult<ScanPage>;

    async fn multi_get(&self, keys: &[String]) -> KvResult<Vec<Option<Vec<u8>>>>;

    /// Start an empty batch
    fn begin_batch(&self) -> Batch {
        Batch::new()
    }

    /// Apply every command of `batch` atomically
    async fn commit(&self, batch: Batch) -> KvResult<BatchOutcome>;

    /// Abandon `batch` without submitting anything
    fn discard(&self, batch: Batch) {
        batch.discard();
    }
}

//! Order store
//!
//! Keeps two structures in the backend:
//!
//! | Structure | Key | Content |
//! |-----------|-----|---------|
//! | primary mapping | `order:<id>` | JSON-encoded [`Order`] |
//! | index set `orders` | - | one `order:<id>` member per stored order |
//!
//! After every completed operation the index set holds exactly the keys of
//! the primary mapping. Insert and Delete touch both structures and always
//! go through a single atomic batch; Update and Get touch only the primary
//! mapping.

use std::sync::Arc;

use shared::{DEFAULT_PAGE_SIZE, Order, OrderPage, PageRequest};
use tracing::{debug, instrument, warn};

use super::context::OpContext;
use super::error::{StoreError, StoreResult};
use super::keys::{ORDER_INDEX_SET, order_key};
use crate::kv::{BatchOutcome, KvBackend};

/// Order persistence on top of a shared key-value backend
#[derive(Clone)]
pub struct OrderStore {
    backend: Arc<dyn KvBackend>,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl OrderStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    /// Store a new order
    ///
    /// Fails with `Conflict` when an order with the same id already exists;
    /// the stored record is left untouched in that case.
    #[instrument(skip(self, ctx, order), fields(order_id = order.order_id))]
    pub async fn insert(&self, ctx: &OpContext, order: &Order) -> StoreResult<()> {
        let key = order_key(order.order_id);

        let mut batch = self.backend.begin_batch();
        let payload = match serde_json::to_vec(order) {
            Ok(payload) => payload,
            Err(e) => {
                self.backend.discard(batch);
                return Err(StoreError::Encode(e));
            }
        };
        batch
            .set_if_absent(key.as_str(), payload)
            .add_to_set(ORDER_INDEX_SET, key.as_str());

        match ctx.run(self.backend.commit(batch)).await? {
            BatchOutcome::Committed(_) => {
                debug!(%key, "order inserted");
                Ok(())
            }
            BatchOutcome::Aborted { .. } => Err(StoreError::Conflict(order.order_id)),
        }
    }

    /// Fetch one order
    #[instrument(skip(self, ctx))]
    pub async fn get(&self, ctx: &OpContext, order_id: u64) -> StoreResult<Order> {
        let key = order_key(order_id);
        let payload = ctx
            .run(self.backend.get(&key))
            .await?
            .ok_or(StoreError::NotFound(order_id))?;
        decode(&key, &payload)
    }

    /// Overwrite an existing order with `order`
    ///
    /// Never creates a record: a missing id yields `NotFound`. The index set
    /// is not touched.
    #[instrument(skip(self, ctx, order))]
    pub async fn update(&self, ctx: &OpContext, order_id: u64, order: &Order) -> StoreResult<()> {
        if order.order_id != order_id {
            warn!(
                record_id = order.order_id,
                "record id differs from the id it is stored under"
            );
        }

        let key = order_key(order_id);
        let payload = serde_json::to_vec(order).map_err(StoreError::Encode)?;

        if ctx.run(self.backend.set_if_present(&key, &payload)).await? {
            debug!(%key, "order updated");
            Ok(())
        } else {
            Err(StoreError::NotFound(order_id))
        }
    }

    /// Remove an order and its index entry
    #[instrument(skip(self, ctx))]
    pub async fn delete(&self, ctx: &OpContext, order_id: u64) -> StoreResult<()> {
        let key = order_key(order_id);

        let mut batch = self.backend.begin_batch();
        batch
            .delete(key.as_str())
            .remove_from_set(ORDER_INDEX_SET, key.as_str());

        match ctx.run(self.backend.commit(batch)).await? {
            BatchOutcome::Committed(_) => {
                debug!(%key, "order deleted");
                Ok(())
            }
            BatchOutcome::Aborted { .. } => Err(StoreError::NotFound(order_id)),
        }
    }

    /// One enumeration step over all stored orders
    ///
    /// Start with cursor `0` and follow the returned cursor until it is `0`
    /// again. Every order present for the whole enumeration is returned at
    /// least once. Orders deleted between the index scan and the read are
    /// skipped.
    #[instrument(skip(self, ctx, page), fields(cursor = page.cursor, count = page.count))]
    pub async fn get_all(&self, ctx: &OpContext, page: PageRequest) -> StoreResult<OrderPage> {
        let count = if page.count == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page.count
        };

        let scan = ctx
            .run(self.backend.scan_set(ORDER_INDEX_SET, page.cursor, count))
            .await?;
        if scan.members.is_empty() {
            return Ok(OrderPage::empty());
        }

        let payloads = ctx.run(self.backend.multi_get(&scan.members)).await?;

        let mut orders = Vec::with_capacity(payloads.len());
        for (key, payload) in scan.members.iter().zip(payloads) {
            match payload {
                Some(payload) => orders.push(decode(key, &payload)?),
                None => warn!(%key, "indexed order vanished before it was read, skipping"),
            }
        }

        debug!(returned = orders.len(), next = scan.cursor, "orders page read");
        Ok(OrderPage {
            orders,
            cursor: scan.cursor,
        })
    }
}

fn decode(key: &str, payload: &[u8]) -> StoreResult<Order> {
    serde_json::from_slice(payload).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryBackend;
    use crate::orders::error::ErrorKind;
    use shared::{CURSOR_START, LineItem};
    use std::collections::BTreeSet;
    use std::time::Duration;
    use uuid::Uuid;

    fn test_order(order_id: u64) -> Order {
        Order::new(
            order_id,
            Uuid::new_v4(),
            vec![LineItem::new(Uuid::new_v4(), 1)],
            shared::util::now_utc(),
        )
    }

    fn store_with(backend: Arc<MemoryBackend>) -> OrderStore {
        OrderStore::new(backend)
    }

    async fn collect_ids(store: &OrderStore, count: usize) -> Vec<u64> {
        let ctx = OpContext::background();
        let mut ids = Vec::new();
        let mut cursor = CURSOR_START;
        loop {
            let page = store
                .get_all(&ctx, PageRequest::new(cursor, count))
                .await
                .unwrap();
            ids.extend(page.orders.iter().map(|o| o.order_id));
            cursor = page.cursor;
            if cursor == CURSOR_START {
                break;
            }
        }
        ids
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = store_with(Arc::new(MemoryBackend::new()));
        let ctx = OpContext::background();
        let order = test_order(7);

        store.insert(&ctx, &order).await.unwrap();
        assert_eq!(store.get(&ctx, 7).await.unwrap(), order);
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        let ctx = OpContext::background();
        let first = test_order(7);

        store.insert(&ctx, &first).await.unwrap();
        let err = store.insert(&ctx, &test_order(7)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.get(&ctx, 7).await.unwrap(), first);
        assert_eq!(backend.set_len(ORDER_INDEX_SET), 1);
    }

    #[tokio::test]
    async fn test_update_missing_creates_nothing() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        let ctx = OpContext::background();

        let err = store.update(&ctx, 5, &test_order(5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(store.get(&ctx, 5).await.unwrap_err().is_not_found());
        assert_eq!(backend.value_count(), 0);
        assert_eq!(backend.set_len(ORDER_INDEX_SET), 0);
    }

    #[tokio::test]
    async fn test_update_overwrites_record() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        let ctx = OpContext::background();
        let mut order = test_order(3);
        store.insert(&ctx, &order).await.unwrap();

        order.shipped_at = Some(shared::util::now_utc());
        store.update(&ctx, 3, &order).await.unwrap();

        assert_eq!(store.get(&ctx, 3).await.unwrap(), order);
        assert_eq!(backend.set_len(ORDER_INDEX_SET), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_both_structures() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        let ctx = OpContext::background();
        store.insert(&ctx, &test_order(1)).await.unwrap();

        store.delete(&ctx, 1).await.unwrap();

        assert!(store.get(&ctx, 1).await.unwrap_err().is_not_found());
        assert_eq!(backend.value_count(), 0);
        assert_eq!(backend.set_len(ORDER_INDEX_SET), 0);
    }

    #[tokio::test]
    async fn test_repeated_delete_is_not_found() {
        let store = store_with(Arc::new(MemoryBackend::new()));
        let ctx = OpContext::background();
        store.insert(&ctx, &test_order(1)).await.unwrap();
        store.delete(&ctx, 1).await.unwrap();

        for _ in 0..2 {
            let err = store.delete(&ctx, 1).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn test_get_all_small_set_in_one_step() {
        let store = store_with(Arc::new(MemoryBackend::new()));
        let ctx = OpContext::background();
        for id in [10, 20, 30] {
            store.insert(&ctx, &test_order(id)).await.unwrap();
        }

        let page = store.get_all(&ctx, PageRequest::first(10)).await.unwrap();
        let ids: BTreeSet<u64> = page.orders.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, BTreeSet::from([10, 20, 30]));
        assert_eq!(page.cursor, CURSOR_START);

        store.delete(&ctx, 20).await.unwrap();
        assert!(store.get(&ctx, 20).await.unwrap_err().is_not_found());

        let page = store.get_all(&ctx, PageRequest::first(10)).await.unwrap();
        let ids: BTreeSet<u64> = page.orders.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, BTreeSet::from([10, 30]));
    }

    #[tokio::test]
    async fn test_get_all_pages_cover_everything() {
        let store = store_with(Arc::new(MemoryBackend::new()));
        let ctx = OpContext::background();
        for id in 1..=57 {
            store.insert(&ctx, &test_order(id)).await.unwrap();
        }

        let ids: BTreeSet<u64> = collect_ids(&store, 5).await.into_iter().collect();
        assert_eq!(ids, (1..=57).collect::<BTreeSet<u64>>());
    }

    #[tokio::test]
    async fn test_get_all_empty_store() {
        let store = store_with(Arc::new(MemoryBackend::new()));
        let page = store
            .get_all(&OpContext::background(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page, OrderPage::empty());
    }

    #[tokio::test]
    async fn test_get_all_skips_vanished_keys() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        let ctx = OpContext::background();
        store.insert(&ctx, &test_order(1)).await.unwrap();

        // Index entry without a record, as seen by a scan racing a delete
        backend
            .add_to_set(ORDER_INDEX_SET, &order_key(2))
            .await
            .unwrap();

        let page = store.get_all(&ctx, PageRequest::first(10)).await.unwrap();
        assert_eq!(page.orders.len(), 1);
        assert_eq!(page.orders[0].order_id, 1);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_not_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        let ctx = OpContext::background();
        backend
            .set_if_absent(&order_key(9), b"{not json")
            .await
            .unwrap();

        let err = store.get(&ctx, 9).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[tokio::test]
    async fn test_transport_failure_classified() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        backend.set_offline(true);

        let err = store
            .insert(&OpContext::background(), &test_order(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_timeout_leaves_no_partial_state() {
        let backend = Arc::new(MemoryBackend::with_latency(Duration::from_millis(200)));
        let store = store_with(backend.clone());
        let ctx = OpContext::background().timeout(Duration::from_millis(10));

        let err = store.insert(&ctx, &test_order(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout));
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(backend.value_count(), 0);
        assert_eq!(backend.set_len(ORDER_INDEX_SET), 0);
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let store = store_with(Arc::new(MemoryBackend::new()));
        let ctx = OpContext::background();
        ctx.cancel();

        let err = store.get(&ctx, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
    }
}

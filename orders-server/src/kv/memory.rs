//! In-process backend
//!
//! Keeps values and sets in memory behind a single `RwLock`. A batch is
//! checked and applied while holding the write lock, so no reader ever
//! observes a half-applied batch.
//!
//! Two knobs make it useful as a test double: an artificial per-call latency
//! and an offline switch that fails every call with a transport error.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::scan::{ScanPage, collect_page, slot_of};
use super::{Batch, BatchOutcome, Command, KvBackend, KvError, KvResult};

#[derive(Debug, Default)]
struct State {
    values: HashMap<String, Vec<u8>>,
    sets: HashMap<String, BTreeSet<(u64, String)>>,
}

impl State {
    /// Index of the first conditional command whose condition fails, taking
    /// earlier commands of the same batch into account
    fn failed_guard(&self, commands: &[Command]) -> Option<usize> {
        let mut overlay: HashMap<&str, bool> = HashMap::new();

        for (index, command) in commands.iter().enumerate() {
            let (key, must_exist, present_after) = match command {
                Command::SetIfAbsent { key, .. } => (key.as_str(), false, true),
                Command::SetIfPresent { key, .. } => (key.as_str(), true, true),
                Command::Delete { key } => (key.as_str(), true, false),
                Command::AddToSet { .. } | Command::RemoveFromSet { .. } => continue,
            };
            let present = overlay
                .get(key)
                .copied()
                .unwrap_or_else(|| self.values.contains_key(key));
            if present != must_exist {
                return Some(index);
            }
            overlay.insert(key, present_after);
        }

        None
    }

    fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::SetIfAbsent { key, value } | Command::SetIfPresent { key, value } => {
                self.values.insert(key, value);
                true
            }
            Command::Delete { key } => self.values.remove(&key).is_some(),
            Command::AddToSet { set, member } => self
                .sets
                .entry(set)
                .or_default()
                .insert((slot_of(&member), member)),
            Command::RemoveFromSet { set, member } => {
                let Some(members) = self.sets.get_mut(&set) else {
                    return false;
                };
                let removed = members.remove(&(slot_of(&member), member));
                if members.is_empty() {
                    self.sets.remove(&set);
                }
                removed
            }
        }
    }

    fn execute(&mut self, commands: Vec<Command>) -> BatchOutcome {
        if let Some(index) = self.failed_guard(&commands) {
            return BatchOutcome::Aborted { index };
        }
        BatchOutcome::Committed(commands.into_iter().map(|c| self.apply(c)).collect())
    }
}

/// In-memory key-value backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
    latency: Option<Duration>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it touches the data
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail (or succeed again) with a transport error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored values
    pub fn value_count(&self) -> usize {
        self.state.read().values.len()
    }

    /// Number of members in `set`
    pub fn set_len(&self, set: &str) -> usize {
        self.state.read().sets.get(set).map_or(0, BTreeSet::len)
    }

    async fn enter(&self) -> KvResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("memory backend is offline".into()));
        }
        Ok(())
    }

    async fn execute(&self, commands: Vec<Command>) -> KvResult<BatchOutcome> {
        self.enter().await?;
        Ok(self.state.write().execute(commands))
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> KvResult<()> {
        self.enter().await
    }

    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        self.enter().await?;
        Ok(self.state.read().values.get(key).cloned())
    }

    async fn set_if_absent(&self, key: &str, value: &[u8]) -> KvResult<bool> {
        let command = Command::SetIfAbsent {
            key: key.to_string(),
            value: value.to_vec(),
        };
        Ok(self.execute(vec![command]).await?.into_single())
    }

    async fn set_if_present(&self, key: &str, value: &[u8]) -> KvResult<bool> {
        let command = Command::SetIfPresent {
            key: key.to_string(),
            value: value.to_vec(),
        };
        Ok(self.execute(vec![command]).await?.into_single())
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        let command = Command::Delete {
            key: key.to_string(),
        };
        Ok(self.execute(vec![command]).await?.into_single())
    }

    async fn add_to_set(&self, set: &str, member: &str) -> KvResult<bool> {
        let command = Command::AddToSet {
            set: set.to_string(),
            member: member.to_string(),
        };
        Ok(self.execute(vec![command]).await?.into_single())
    }

    async fn remove_from_set(&self, set: &str, member: &str) -> KvResult<bool> {
        let command = Command::RemoveFromSet {
            set: set.to_string(),
            member: member.to_string(),
        };
        Ok(self.execute(vec![command]).await?.into_single())
    }

    async fn scan_set(&self, set: &str, cursor: u64, count: usize) -> KvResult<ScanPage> {
        self.enter().await?;
        let state = self.state.read();
        let Some(members) = state.sets.get(set) else {
            return Ok(ScanPage::default());
        };
        let entries = members
            .range((cursor, String::new())..)
            .map(|(slot, member)| Ok::<_, KvError>((*slot, member.clone())));
        collect_page(entries, count)
    }

    async fn multi_get(&self, keys: &[String]) -> KvResult<Vec<Option<Vec<u8>>>> {
        self.enter().await?;
        let state = self.state.read();
        Ok(keys.iter().map(|key| state.values.get(key).cloned()).collect())
    }

    async fn commit(&self, batch: Batch) -> KvResult<BatchOutcome> {
        self.execute(batch.into_commands()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::CURSOR_START;

    #[tokio::test]
    async fn test_conditional_writes() {
        let kv = MemoryBackend::new();

        assert!(kv.set_if_absent("k", b"1").await.unwrap());
        assert!(!kv.set_if_absent("k", b"2").await.unwrap());
        assert_eq!(kv.get("k").await.unwrap(), Some(b"1".to_vec()));

        assert!(kv.set_if_present("k", b"3").await.unwrap());
        assert!(!kv.set_if_present("missing", b"3").await.unwrap());
        assert_eq!(kv.get("missing").await.unwrap(), None);

        assert!(kv.delete("k").await.unwrap());
        assert!(!kv.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_aborted_batch_applies_nothing() {
        let kv = MemoryBackend::new();
        kv.set_if_absent("order:1", b"old").await.unwrap();

        let mut batch = kv.begin_batch();
        batch
            .add_to_set("orders", "order:1")
            .set_if_absent("order:1", b"new".to_vec());

        assert_eq!(
            kv.commit(batch).await.unwrap(),
            BatchOutcome::Aborted { index: 1 }
        );
        assert_eq!(kv.get("order:1").await.unwrap(), Some(b"old".to_vec()));
        assert_eq!(kv.set_len("orders"), 0);
    }

    #[tokio::test]
    async fn test_guards_see_earlier_commands() {
        let kv = MemoryBackend::new();

        let mut batch = kv.begin_batch();
        batch
            .set_if_absent("k", b"v".to_vec())
            .delete("k")
            .delete("k");

        assert_eq!(
            kv.commit(batch).await.unwrap(),
            BatchOutcome::Aborted { index: 2 }
        );
        assert_eq!(kv.value_count(), 0);
    }

    #[tokio::test]
    async fn test_scan_full_cycle() {
        let kv = MemoryBackend::new();
        for i in 0..25 {
            kv.add_to_set("s", &format!("m{i}")).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = CURSOR_START;
        loop {
            let page = kv.scan_set("s", cursor, 4).await.unwrap();
            seen.extend(page.members);
            cursor = page.cursor;
            if cursor == CURSOR_START {
                break;
            }
        }

        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 25);
    }

    #[tokio::test]
    async fn test_scan_missing_set() {
        let kv = MemoryBackend::new();
        let page = kv.scan_set("nothing", CURSOR_START, 10).await.unwrap();
        assert!(page.members.is_empty());
        assert_eq!(page.cursor, CURSOR_START);
    }

    #[tokio::test]
    async fn test_multi_get_is_positional() {
        let kv = MemoryBackend::new();
        kv.set_if_absent("a", b"1").await.unwrap();
        kv.set_if_absent("c", b"3").await.unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let values = kv.multi_get(&keys).await.unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
    }

    #[tokio::test]
    async fn test_offline_fails_with_unavailable() {
        let kv = MemoryBackend::new();
        kv.set_offline(true);
        assert!(matches!(kv.get("k").await, Err(KvError::Unavailable(_))));

        kv.set_offline(false);
        assert!(kv.get("k").await.unwrap().is_none());
    }
}

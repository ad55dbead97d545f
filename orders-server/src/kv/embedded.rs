//! redb-based backend
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `kv` | `key` | raw bytes | Plain values |
//! | `set_members` | `(set, slot, member)` | `()` | Set membership, ordered for scanning |
//!
//! Every call runs on the blocking pool. A batch is one write transaction:
//! it commits when all conditional commands hold and is aborted otherwise.
//!
//! # Abandoned writes
//!
//! A batch whose caller stopped waiting (cancelled or past its deadline) is
//! aborted rather than committed: the writer checks once the write lock is
//! acquired and again right before `commit`. Only a caller that gives up
//! while `commit` itself is running can still see its batch land.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use super::scan::{ScanPage, collect_page, slot_of};
use super::{Batch, BatchOutcome, Command, KvBackend, KvError, KvResult};

/// Plain values: key = string key, value = opaque bytes
const VALUES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

/// Set membership: key = (set name, scan slot, member), value = empty
const SET_MEMBERS_TABLE: TableDefinition<(&str, u64, &str), ()> =
    TableDefinition::new("set_members");

/// Key-value backend backed by redb
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Database::create(path)?)
    }

    /// Open a database that lives only in memory
    pub fn open_in_memory() -> KvResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> KvResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(VALUES_TABLE)?;
            let _ = write_txn.open_table(SET_MEMBERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, f: F) -> KvResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> KvResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    async fn execute(&self, commands: Vec<Command>) -> KvResult<BatchOutcome> {
        let abandoned = AbandonOnDrop::default();
        let flag = abandoned.flag();
        self.blocking(move |db| execute(db, commands, &flag)).await
    }
}

/// Raises its flag when dropped
///
/// Held by the awaiting side of a write. Once the caller stops waiting
/// (cancellation or deadline) the blocking writer sees the flag and aborts
/// instead of committing.
#[derive(Default)]
struct AbandonOnDrop(Arc<AtomicBool>);

impl AbandonOnDrop {
    fn flag(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn execute(db: &Database, commands: Vec<Command>, abandoned: &AtomicBool) -> KvResult<BatchOutcome> {
    let txn = db.begin_write()?;
    // begin_write blocks while another writer holds the lock
    if abandoned.load(Ordering::SeqCst) {
        txn.abort()?;
        return Err(KvError::Abandoned);
    }

    match apply_commands(&txn, &commands)? {
        Ok(results) => {
            if abandoned.load(Ordering::SeqCst) {
                txn.abort()?;
                return Err(KvError::Abandoned);
            }
            txn.commit()?;
            Ok(BatchOutcome::Committed(results))
        }
        Err(index) => {
            txn.abort()?;
            tracing::debug!(
                index,
                command = commands[index].name(),
                "batch aborted on failed condition"
            );
            Ok(BatchOutcome::Aborted { index })
        }
    }
}

/// Apply commands inside `txn`; `Err(index)` names the first failed condition
fn apply_commands(txn: &WriteTransaction, commands: &[Command]) -> KvResult<Result<Vec<bool>, usize>> {
    let mut values = txn.open_table(VALUES_TABLE)?;
    let mut members = txn.open_table(SET_MEMBERS_TABLE)?;
    let mut results = Vec::with_capacity(commands.len());

    for (index, command) in commands.iter().enumerate() {
        let applied = match command {
            Command::SetIfAbsent { key, value } => {
                if values.get(key.as_str())?.is_some() {
                    return Ok(Err(index));
                }
                values.insert(key.as_str(), value.as_slice())?;
                true
            }
            Command::SetIfPresent { key, value } => {
                if values.get(key.as_str())?.is_none() {
                    return Ok(Err(index));
                }
                values.insert(key.as_str(), value.as_slice())?;
                true
            }
            Command::Delete { key } => {
                if values.remove(key.as_str())?.is_none() {
                    return Ok(Err(index));
                }
                true
            }
            Command::AddToSet { set, member } => members
                .insert((set.as_str(), slot_of(member), member.as_str()), ())?
                .is_none(),
            Command::RemoveFromSet { set, member } => members
                .remove((set.as_str(), slot_of(member), member.as_str()))?
                .is_some(),
        };
        results.push(applied);
    }

    Ok(Ok(results))
}

fn read_value(db: &Database, key: &str) -> KvResult<Option<Vec<u8>>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(VALUES_TABLE)?;
    Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
}

fn read_values(db: &Database, keys: &[String]) -> KvResult<Vec<Option<Vec<u8>>>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(VALUES_TABLE)?;

    let mut values = Vec::with_capacity(keys.len());
    for key in keys {
        values.push(table.get(key.as_str())?.map(|guard| guard.value().to_vec()));
    }
    Ok(values)
}

fn scan_members(db: &Database, set: &str, cursor: u64, count: usize) -> KvResult<ScanPage> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(SET_MEMBERS_TABLE)?;

    let entries = table
        .range((set, cursor, "")..)?
        .map(|entry| {
            let (key, _) = entry?;
            let (owner, slot, member) = key.value();
            Ok::<_, KvError>((owner == set, slot, member.to_string()))
        })
        // Keys of the following sets sort after this one
        .take_while(|entry| !matches!(entry, Ok((false, _, _))))
        .map(|entry| entry.map(|(_, slot, member)| (slot, member)));

    collect_page(entries, count)
}

#[async_trait]
impl KvBackend for RedbBackend {
    fn name(&self) -> &'static str {
        "redb"
    }

    async fn ping(&self) -> KvResult<()> {
        self.blocking(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(VALUES_TABLE)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        let key = key.to_string();
        self.blocking(move |db| read_value(db, &key)).await
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
        let set = set.to_string();
        self.blocking(move |db| scan_members(db, &set, cursor, count))
            .await
    }

    async fn multi_get(&self, keys: &[String]) -> KvResult<Vec<Option<Vec<u8>>>> {
        let keys = keys.to_vec();
        self.blocking(move |db| read_values(db, &keys)).await
    }

    async fn commit(&self, batch: Batch) -> KvResult<BatchOutcome> {
        self.execute(batch.into_commands()).await
    }
}

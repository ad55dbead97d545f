use thiserror::Error;

/// Backend errors
///
/// Everything here is a transport-class failure: the backend could not carry
/// out the request, independent of what data is stored.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Write abandoned by its caller")]
    Abandoned,

    #[error("Backend task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type KvResult<T> = Result<T, KvError>;

use thiserror::Error;

use crate::kv::KvError;

/// Error classes exposed to callers of the order store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Key absent where presence was required
    NotFound,
    /// Key present where absence was required
    Conflict,
    /// Stored payload could not be (de)serialized
    Corrupt,
    /// Backend failure unrelated to the data
    Transport,
    /// Caller abort or deadline
    Cancelled,
}

/// Order store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order does not exist: {0}")]
    NotFound(u64),

    #[error("order already exists: {0}")]
    Conflict(u64),

    #[error("failed to decode order at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode order: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("backend error: {0}")]
    Transport(#[from] KvError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out")]
    Timeout,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Corrupt { .. } | StoreError::Encode(_) => ErrorKind::Corrupt,
            StoreError::Transport(_) => ErrorKind::Transport,
            StoreError::Cancelled | StoreError::Timeout => ErrorKind::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(StoreError::NotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::Conflict(1).kind(), ErrorKind::Conflict);
        assert_eq!(StoreError::Timeout.kind(), ErrorKind::Cancelled);
        assert_eq!(
            StoreError::from(KvError::Unavailable("down".into())).kind(),
            ErrorKind::Transport
        );

        let source = serde_json::from_slice::<u64>(b"nope").unwrap_err();
        let err = StoreError::Corrupt {
            key: "order:1".into(),
            source,
        };
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert!(err.to_string().contains("order:1"));
    }
}

use thiserror::Error;

use crate::kv::KvError;

/// Startup and serving failures
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("storage backend unavailable: {0}")]
    Storage(#[from] KvError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

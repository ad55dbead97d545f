use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::config::BackendKind;
use crate::core::{Config, Result};
use crate::kv::{KvBackend, MemoryBackend, RedbBackend};
use crate::orders::{OpContext, OrderStore};

/// Server state shared by every request handler
///
/// Cheap to clone: the store holds its backend behind an `Arc` and the
/// shutdown token is reference counted.
///
/// | Field | Type | Meaning |
/// |-------|------|---------|
/// | config | Config | Immutable settings |
/// | store | OrderStore | Order persistence |
/// | shutdown | CancellationToken | Fired on graceful shutdown |
///
/// # Example
///
/// ```ignore
/// let state = ServerState::initialize(&config)?;
/// let ctx = state.op_context();
/// let order = state.store.get(&ctx, 42).await?;
/// ```
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub store: OrderStore,
    shutdown: CancellationToken,
}

impl ServerState {
    pub fn new(config: Config, store: OrderStore) -> Self {
        Self {
            config,
            store,
            shutdown: CancellationToken::new(),
        }
    }

    /// Open the configured backend and build the state around it
    pub fn initialize(config: &Config) -> Result<Self> {
        let backend: Arc<dyn KvBackend> = match config.backend {
            BackendKind::Redb => {
                let path = config.database_path();
                tracing::info!(path = %path.display(), "Opening redb order database");
                Arc::new(RedbBackend::open(&path)?)
            }
            BackendKind::Memory => {
                tracing::warn!("Using in-memory order storage, data is lost on restart");
                Arc::new(MemoryBackend::new())
            }
        };

        Ok(Self::new(config.clone(), OrderStore::new(backend)))
    }

    /// Context for the store calls of a single request
    ///
    /// Cancelled on shutdown and bounded by the configured request timeout.
    pub fn op_context(&self) -> OpContext {
        OpContext::with_token(self.shutdown.child_token()).timeout(self.config.request_timeout())
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend().name()
    }
}

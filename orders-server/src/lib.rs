//! Orders Server - order storage over a key-value backend
//!
//! # Architecture
//!
//! - **Key-value backends** (`kv`): memory and redb implementations of one
//!   async contract with conditional writes, sets and atomic batches
//! - **Order store** (`orders`): insert / get / update / delete and cursor
//!   pagination over the `orders` index set
//! - **HTTP API** (`api`): JSON endpoints on top of the store
//!
//! # Layout
//!
//! ```text
//! orders-server/src/
//! ├── core/          # config, state, server, startup errors
//! ├── kv/            # backend contract, batches, scanning
//! ├── orders/        # order store
//! ├── api/           # HTTP handlers
//! ├── routes/        # router and middleware
//! └── utils/         # HTTP errors, logging
//! ```

pub mod api;
pub mod core;
pub mod kv;
pub mod orders;
pub mod routes;
pub mod utils;

// Re-exports
pub use crate::core::{Config, Server, ServerError, ServerState};
pub use kv::{KvBackend, KvError, MemoryBackend, RedbBackend};
pub use orders::{ErrorKind, OpContext, OrderStore, StoreError};
pub use routes::build_app;
pub use utils::{AppError, AppResult};

pub use utils::logger::init_logger_with_file;

/// Load `.env`, read the configuration and initialize logging from it
pub fn setup_environment() -> anyhow::Result<Config> {
    match dotenv::dotenv() {
        Ok(path) => eprintln!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(anyhow::anyhow!("failed to load .env: {e}")),
    }

    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    api::health::mark_started();
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   ____          __
  / __ \________/ /__  __________
 / / / / ___/ __  / _ \/ ___/ ___/
/ /_/ / /  / /_/ /  __/ /  (__  )
\____/_/   \__,_/\___/_/  /____/
    "#
    );
}

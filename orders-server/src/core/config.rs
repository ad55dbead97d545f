use std::path::PathBuf;
use std::time::Duration;

use shared::DEFAULT_PAGE_SIZE;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Persistent redb database under `data_dir`
    Redb,
    /// In-process, lost on restart
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(BackendKind::Redb),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | ORDERS_SERVICE_SERVER_PORT | 3000 | HTTP port |
/// | STORE_BACKEND | redb | `redb` or `memory` |
/// | DATA_DIR | ./data | Directory holding `orders.redb` |
/// | REQUEST_TIMEOUT_MS | 30000 | Deadline for store calls made by one request |
/// | PAGE_SIZE | 10 | Count hint for list requests |
/// | LOG_LEVEL | info | Log level |
/// | LOG_DIR | - | Directory for daily log files |
///
/// Unparseable values fall back to the default.
///
/// # Example
///
/// ```ignore
/// STORE_BACKEND=memory ORDERS_SERVICE_SERVER_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API port
    pub http_port: u16,
    /// Storage backend
    pub backend: BackendKind,
    /// Data directory for persistent backends
    pub data_dir: PathBuf,
    /// Per-request store deadline (milliseconds)
    pub request_timeout_ms: u64,
    /// Count hint for list requests
    pub page_size: usize,
    /// Log level
    pub log_level: String,
    /// Log directory (stdout only when unset)
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default_values();
        Self {
            http_port: lookup("ORDERS_SERVICE_SERVER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.http_port),
            backend: lookup("STORE_BACKEND")
                .and_then(|b| b.parse().ok())
                .unwrap_or(defaults.backend),
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            request_timeout_ms: lookup("REQUEST_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_ms),
            page_size: lookup("PAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|&v| v > 0)
                .unwrap_or(defaults.page_size),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: lookup("LOG_DIR").filter(|d| !d.is_empty()),
        }
    }

    fn default_values() -> Self {
        Self {
            http_port: 3000,
            backend: BackendKind::Redb,
            data_dir: PathBuf::from("./data"),
            request_timeout_ms: 30_000,
            page_size: DEFAULT_PAGE_SIZE,
            log_level: "info".into(),
            log_dir: None,
        }
    }

    /// In-memory configuration on the given port, used by tests
    pub fn in_memory(http_port: u16) -> Self {
        Self {
            http_port,
            backend: BackendKind::Memory,
            ..Self::default_values()
        }
    }

    /// Path of the redb database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("orders.redb")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

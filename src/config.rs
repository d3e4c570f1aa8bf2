//! Runtime configuration
//!
//! Values come from CLI flags with environment fallbacks; `.env` files are
//! loaded first so local setups need no exported variables.

use crate::catalog::GameCatalog;
use crate::ledger::LedgerStore;
use crate::store::{MemoryStore, SqliteStore};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(name = "betledger")]
#[command(about = "Bet ledger backend - games, bets and per-user ledgers over HTTP")]
pub struct Config {
    /// Interface to bind
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Storage backend
    #[arg(long, env = "STORAGE_BACKEND", value_enum, default_value = "sqlite")]
    pub storage: StorageBackend,

    /// SQLite database file (relative paths resolve against the crate dir)
    #[arg(long, env = "LEDGER_DB_PATH", default_value = "betledger.db")]
    pub db_path: String,

    /// Bearer token for admin routes; admin routes are refused when unset
    #[arg(long, env = "ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    /// Max request body size in bytes
    #[arg(long, env = "BODY_LIMIT_BYTES", default_value_t = DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open the configured backend; one store serves both seams
    pub fn open_storage(&self) -> Result<(Arc<dyn GameCatalog>, Arc<dyn LedgerStore>)> {
        match self.storage {
            StorageBackend::Sqlite => {
                let path = resolve_data_path(&self.db_path);
                let store = Arc::new(
                    SqliteStore::new(&path)
                        .with_context(|| format!("Failed to open ledger database at {}", path))?,
                );
                let games: Arc<dyn GameCatalog> = store.clone();
                let ledgers: Arc<dyn LedgerStore> = store;
                Ok((games, ledgers))
            }
            StorageBackend::Memory => {
                warn!("⚠️  In-memory storage: games and ledgers are lost on restart");
                let store = Arc::new(MemoryStore::new());
                let games: Arc<dyn GameCatalog> = store.clone();
                let ledgers: Arc<dyn LedgerStore> = store;
                Ok((games, ledgers))
            }
        }
    }
}

/// Relative paths are taken relative to the crate dir, not the caller's cwd.
pub fn resolve_data_path(raw: &str) -> String {
    let p = PathBuf::from(raw.trim());
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(p)
        .to_string_lossy()
        .to_string()
}

pub fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv::dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "betledger",
            "--port",
            "8080",
            "--storage",
            "memory",
            "--admin-token",
            "s3cret",
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
        assert!(config.bind_addr().ends_with(":8080"));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Config::try_parse_from(["betledger", "--storage", "mongo"]).is_err());
    }

    #[test]
    fn test_resolve_data_path() {
        assert_eq!(resolve_data_path("/var/lib/ledger.db"), "/var/lib/ledger.db");

        let relative = resolve_data_path("data/ledger.db");
        assert!(relative.starts_with(env!("CARGO_MANIFEST_DIR")));
        assert!(relative.ends_with("ledger.db"));
    }

    #[test]
    fn test_open_memory_storage() {
        let config = Config::try_parse_from(["betledger", "--storage", "memory"]).unwrap();
        assert!(config.open_storage().is_ok());
    }
}

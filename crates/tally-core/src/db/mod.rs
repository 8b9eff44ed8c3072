//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Transaction snapshot reads (and inserts for seeding)
//! - `relations` - Relation graph persistence
//!
//! `Database` implements both [`crate::store::TransactionStore`] and
//! [`crate::store::RelationStore`]. The trait methods run their rusqlite
//! work on tokio's blocking pool so callers can time them out.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod relations;
mod transactions;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "TALLY_DB_KEY";

/// Storage format for timestamps (always UTC)
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"tally-salt-v1-ok";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let output = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(output.as_bytes()))
}

/// Format a timestamp for storage
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp; `None` if the column is not a valid timestamp
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
    /// Held by a blocking write until it commits, even if its caller gave up
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Database {
    /// Open an encrypted database
    ///
    /// Requires `TALLY_DB_KEY` to be set. Use `new_unencrypted()` for
    /// development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Open an unencrypted database
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database with an explicit encryption passphrase
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?);
            let manager = manager.with_init(move |conn| conn.execute_batch(&key_pragma));
            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` so every pooled
    /// connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tally_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run a read on the blocking thread pool
    pub(crate) async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(db))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }

    /// Run a write on the blocking thread pool
    ///
    /// Writes start in the order they were issued. A write whose caller is
    /// dropped (e.g. by a deadline) still finishes before the next one starts.
    pub(crate) async fn run_blocking_write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.write_lock.clone().lock_owned().await;
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            f(db)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the rebuild writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Transactions (owned by the ledger; read-only for the graph)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                occurred_at TEXT,                          -- UTC "YYYY-MM-DD HH:MM:SS"
                category_id INTEGER,
                account_id INTEGER,
                amount REAL NOT NULL,
                direction TEXT NOT NULL DEFAULT 'debit',   -- debit, credit
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_user_time ON transactions(user_id, occurred_at);

            -- Relation graph (full snapshot per user, replaced on every rebuild)
            CREATE TABLE IF NOT EXISTS entity_relations (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                entity_type TEXT NOT NULL,                 -- transaction, category, account
                entity_id INTEGER NOT NULL,
                related_type TEXT NOT NULL,
                related_id INTEGER NOT NULL,
                relation_type TEXT NOT NULL,               -- belongs_to, from_account, followed_by, same_day, same_day_same_category
                strength REAL NOT NULL CHECK (strength >= 0.0 AND strength <= 1.0),
                metadata TEXT,                             -- JSON diagnostics
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_relations_user ON entity_relations(user_id);
            CREATE INDEX IF NOT EXISTS idx_relations_user_type ON entity_relations(user_id, relation_type);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

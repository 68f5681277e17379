//! Storage handle and schema.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, MutexGuard};

/// Idempotent schema setup, run at startup. The two unique indexes are what
/// turn a raced duplicate submission into a clean conflict instead of a
/// second row.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS registration (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        age INTEGER NOT NULL,
        experience TEXT NOT NULL,
        songs INTEGER NOT NULL,
        selected_songs TEXT NOT NULL,
        price INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        workshop TEXT NOT NULL,
        transaction_id TEXT,
        payment_method TEXT,
        paid_at INTEGER,
        notes TEXT,
        registered_at INTEGER NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS registration_email_workshop
        ON registration (email, workshop)",
    "CREATE UNIQUE INDEX IF NOT EXISTS registration_phone_workshop
        ON registration (phone, workshop)",
];

pub async fn migrate(pool: &SqlitePool) -> sqlx::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// The storage handle the rest of the API is constructed with. Owns the pool
/// plus the advisory lock that serializes registration creation, so the
/// count-then-price-then-insert sequence can't race itself at the early-bird
/// boundary.
pub struct Db {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl Db {
    pub fn new(pool: SqlitePool) -> Self {
        Db {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Held for the duration of a create. Readers are unaffected.
    pub async fn create_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}

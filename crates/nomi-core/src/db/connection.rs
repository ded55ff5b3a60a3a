//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Database wrapper for a local libSQL connection
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::from_libsql(db).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_libsql(db).await
    }

    async fn from_libsql(db: LibSqlDatabase) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    async fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases; ignore the refusal
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA cache_size = 10000;", ())
            .await
            .ok();
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Open a write transaction on `conn`.
pub(crate) async fn begin(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN IMMEDIATE", ()).await?;
    Ok(())
}

/// Commit when `outcome` succeeded, roll back otherwise.
///
/// Either every statement since [`begin`] becomes visible or none does.
pub(crate) async fn finish<T>(conn: &Connection, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            if let Err(e) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
            Ok(value)
        }
        Err(e) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(e)
        }
    }
}

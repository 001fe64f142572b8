mod schema;

use std::path::Path;
use std::time::Duration;

use log::{error, info};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension};

use crate::error::DbPilotError;
use schema::{CREATE_SCHEMA_SQL, SCHEMA_VERSION};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata store holding backup and backup setting rows.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (creating if needed) the metadata database at `path`.
    pub fn open(path: &Path) -> Result<Self, DbPilotError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = Pool::builder().max_size(8).build(manager)?;

        let db = Database { pool };
        db.ensure_schema()?;
        info!("Metadata database opened at: {}", path.display());

        Ok(db)
    }

    /// Single-connection in-memory store. Every connection of an in-memory
    /// manager is a separate database, so the pool is capped at one.
    pub fn open_in_memory() -> Result<Self, DbPilotError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Database { pool };
        db.ensure_schema()?;

        Ok(db)
    }

    pub fn get_connection(&self) -> Result<PooledConn, DbPilotError> {
        Ok(self.pool.get()?)
    }

    /// Run `f` inside `BEGIN IMMEDIATE ... COMMIT`, rolling back if `f` fails.
    pub fn immediate_transaction<T, F>(conn: &Connection, f: F) -> Result<T, DbPilotError>
    where
        F: FnOnce(&Connection) -> Result<T, DbPilotError>,
    {
        conn.execute_batch("BEGIN IMMEDIATE")?;

        match f(conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                    error!("Failed to roll back transaction: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    fn ensure_schema(&self) -> Result<(), DbPilotError> {
        let conn = self.get_connection()?;

        let table_exists: bool = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='meta'",
                [],
                |row| row.get::<_, i32>(0),
            )
            .map(|count| count > 0)?;

        if !table_exists {
            conn.execute_batch(CREATE_SCHEMA_SQL)?;
            return Ok(());
        }

        let stored_version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match stored_version.as_deref() {
            Some(SCHEMA_VERSION) => Ok(()),
            Some(other) => Err(DbPilotError::Error(format!(
                "Schema version mismatch: found {}, expected {}",
                other, SCHEMA_VERSION
            ))),
            None => Err(DbPilotError::Error("Schema version missing".to_string())),
        }
    }
}

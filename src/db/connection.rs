use rusqlite::{Connection, Transaction};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use crate::errors::ServerError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Thread-local connection slots, one per database file.
thread_local! {
    static DB_CONNS: RefCell<HashMap<String, Connection>> = RefCell::new(HashMap::new());
}

/// Read handle for one tenant database. Holds only the path, so it is cheap to
/// clone into worker threads.
#[derive(Clone, Debug)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ServerError>,
    {
        DB_CONNS
            .try_with(|cell| {
                let mut slots = cell.borrow_mut();
                if !slots.contains_key(&self.path) {
                    let conn = Connection::open(&self.path)
                        .map_err(|e| ServerError::DbError(format!("Open DB failed: {e}")))?;
                    conn.pragma_update(None, "foreign_keys", "ON")
                        .map_err(|e| ServerError::DbError(format!("Enable foreign keys failed: {e}")))?;
                    // worker threads share the file; wait for a writer instead of failing
                    conn.busy_timeout(BUSY_TIMEOUT)
                        .map_err(|e| ServerError::DbError(format!("Set busy timeout failed: {e}")))?;
                    slots.insert(self.path.clone(), conn);
                }
                let conn = slots.get_mut(&self.path).ok_or(ServerError::InternalError)?;
                f(conn)
            })
            .map_err(|_| ServerError::InternalError)?
    }
}

/// Write handle. Only exists when the admin token is configured, so holding
/// one is the proof that privileged writes are allowed.
#[derive(Clone, Debug)]
pub struct AdminDatabase {
    db: Database,
}

impl AdminDatabase {
    pub(crate) fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn reader(&self) -> &Database {
        &self.db
    }

    /// Runs `f` inside one SQLite transaction; commits only if `f` succeeds.
    /// Returning `Err` from `f` rolls everything back.
    pub fn with_tx<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<ServerError>,
    {
        self.db.with_conn(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;
            match f(&tx) {
                Ok(out) => {
                    tx.commit()
                        .map_err(|e| ServerError::DbError(format!("commit failed: {e}")))?;
                    Ok(Ok(out))
                }
                Err(e) => Ok(Err(e)),
            }
        })?
    }
}

/// Initialize database from a SQL schema file
pub fn init_db(db: &Database, schema_path: &str) -> Result<(), ServerError> {
    let schema_sql = fs::read_to_string(schema_path)
        .map_err(|e| ServerError::DbError(format!("Failed to read schema file: {e}")))?;

    db.with_conn(|conn| {
        conn.execute_batch(&schema_sql)
            .map_err(|e| ServerError::DbError(format!("Failed to apply schema: {e}")))?;
        Ok(())
    })?;

    tracing::info!(path = db.path(), schema = schema_path, "database initialized");
    Ok(())
}

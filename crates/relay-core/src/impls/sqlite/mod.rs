//! SqliteRegistry - the entity registry on top of a single SQLite connection.
//!
//! # Implementation details
//! - One `rusqlite::Connection` behind a `Mutex`: request handlers and the
//!   scheduler share it, and no two statements ever run at the same time
//! - The lock is never held across an `.await`
//! - Multi-statement operations run inside `Connection::transaction`, which
//!   rolls back when dropped without `commit`
//! - `CREATED_ON`/`UPDATED_ON` are stamped from the injected clock
//!
//! # Example
//! ```ignore
//! let registry = SqliteRegistry::open(Path::new("relay.db"), Arc::new(SystemClock))?;
//! let pending = registry.pending_steps().await?;
//! ```

mod ports;
mod rows;
mod schema;

use rusqlite::{Connection, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{EntityKind, State, StoreError};
use crate::ports::Clock;

use self::rows::{Entity, Filter};

pub struct SqliteRegistry {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteRegistry {
    /// Open or create the database file and apply the schema.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?, clock)
    }

    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, clock)
    }

    fn with_connection(conn: Connection, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        conn.execute_batch(schema::SCHEMA)?;
        tracing::debug!("sqlite schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run raw SQL against the connection (fixtures, maintenance).
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    /// Load 0..n rows of one entity kind.
    pub(crate) fn read<E: Entity>(&self, filter: Filter) -> Result<Vec<E>, StoreError> {
        let sql = format!("{} {} ORDER BY T.ID", E::SELECT, filter.where_clause());
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(filter.params()), E::from_row)?
            .collect::<Result<Vec<E>, _>>()?;
        tracing::debug!(table = %E::KIND, count = rows.len(), "read");
        Ok(rows)
    }

    pub(crate) fn read_one<E: Entity>(&self, id: i64) -> Result<Option<E>, StoreError> {
        Ok(self.read::<E>(Filter::Id(id))?.into_iter().next())
    }

    /// Set `STATE` of one row and stamp `UPDATED_ON`. Returns the affected
    /// row count.
    pub(crate) fn update_state(
        &self,
        kind: EntityKind,
        id: i64,
        state: State,
    ) -> Result<usize, StoreError> {
        if !kind.has_state() {
            return Err(StoreError::Corrupt(format!("{kind} has no STATE column")));
        }
        let sql = format!(
            "UPDATE {} SET STATE = ?1, UPDATED_ON = ?2 WHERE ID = ?3",
            kind.table()
        );
        let now = self.clock.now();
        let conn = self.lock()?;
        let affected = conn.execute(&sql, rusqlite::params![state, now, id])?;
        Ok(affected)
    }

    /// Soft delete. Returns the affected row count, 0 for a row that is
    /// missing or already deleted.
    pub(crate) fn mark_deleted(&self, kind: EntityKind, id: i64) -> Result<usize, StoreError> {
        let sql = format!(
            "UPDATE {} SET DELETED = 1, UPDATED_ON = ?1 WHERE ID = ?2 AND DELETED = 0",
            kind.table()
        );
        let now = self.clock.now();
        let conn = self.lock()?;
        Ok(conn.execute(&sql, rusqlite::params![now, id])?)
    }
}

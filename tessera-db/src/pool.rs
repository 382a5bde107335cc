//! Connection pooling with per-connection session setup.

use crate::error::DbResult;
use crate::migrations;
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Every connection gets the TEMP session-context table and the
/// row-filter views before it is handed out. The views are TEMP
/// because SQLite does not allow a persistent view to reference a
/// TEMP table.
const CONNECTION_SETUP: &str = r#"
CREATE TEMP TABLE IF NOT EXISTS session_context (
    tenant_id INTEGER NOT NULL,
    user_id   INTEGER NOT NULL
);

CREATE TEMP VIEW IF NOT EXISTS visible_plugin_states AS
SELECT s.tenant_id, s.plugin_id, s.version, s.enabled, s.config
FROM plugin_states s
JOIN temp.session_context ctx
WHERE (ctx.tenant_id = 0 AND ctx.user_id = 0)
   OR s.tenant_id = ctx.tenant_id;

CREATE TEMP VIEW IF NOT EXISTS visible_plugin_permission_grants AS
SELECT g.tenant_id, g.plugin_id, g.user_id, g.ability,
       g.resource_type, g.resource_id, g.granted_by
FROM plugin_permission_grants g
JOIN temp.session_context ctx
WHERE (ctx.tenant_id = 0 AND ctx.user_id = 0)
   OR g.tenant_id = ctx.tenant_id;
"#;

static MEMORY_DB_SEQ: AtomicU64 = AtomicU64::new(0);

/// Small connection pool for a single SQLite database.
///
/// Registries and stores borrow a connection per operation (or per
/// transaction); the pool keeps returned connections for reuse. The
/// session-context table is per-connection TEMP state, so a returned
/// connection carries no context — context rows only ever exist inside
/// an open transaction.
pub struct DbPool {
    uri: String,
    idle: Mutex<Vec<Connection>>,
}

impl DbPool {
    /// Opens (and migrates) the database at `path`.
    pub fn open(path: &Path) -> DbResult<Self> {
        Self::open_uri(path.display().to_string())
    }

    /// Opens a private in-memory database (shared-cache, so every
    /// pooled connection sees the same data). Used by tests.
    pub fn open_in_memory() -> DbResult<Self> {
        let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        Self::open_uri(format!("file:tessera_mem_{seq}?mode=memory&cache=shared"))
    }

    fn open_uri(uri: String) -> DbResult<Self> {
        let pool = Self {
            uri,
            idle: Mutex::new(Vec::new()),
        };
        // The first connection applies migrations and then anchors the
        // pool; for in-memory databases it keeps the schema alive.
        let conn = pool.open_connection()?;
        migrations::apply(&conn)?;
        pool.idle
            .lock()
            .expect("db pool mutex poisoned")
            .push(conn);
        Ok(pool)
    }

    fn open_connection(&self) -> DbResult<Connection> {
        let conn = Connection::open(&self.uri)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(CONNECTION_SETUP)?;
        debug!(uri = %self.uri, "opened database connection");
        Ok(conn)
    }

    /// Borrows a connection from the pool, opening a new one if all
    /// pooled connections are in use.
    pub fn connection(&self) -> DbResult<PooledConnection<'_>> {
        let reused = self
            .idle
            .lock()
            .expect("db pool mutex poisoned")
            .pop();
        let conn = match reused {
            Some(conn) => conn,
            None => self.open_connection()?,
        };
        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
        })
    }
}

/// A connection borrowed from a [`DbPool`]; returned on drop.
pub struct PooledConnection<'a> {
    pool: &'a DbPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection taken")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool
                .idle
                .lock()
                .expect("db pool mutex poisoned")
                .push(conn);
        }
    }
}

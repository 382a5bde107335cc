//! Host schema migrations, applied automatically on pool open.
//!
//! These migrate the host's own tables only. Plugin tables are
//! migrated by each plugin's migration code, which records its
//! progress through `schema_gate`.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use tracing::info;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_plugin_schema_versions",
        r#"
        CREATE TABLE plugin_schema_versions (
            plugin_id                TEXT PRIMARY KEY,
            schema_version           INTEGER NOT NULL,
            installed_plugin_version TEXT NOT NULL,
            last_migration_name      TEXT NOT NULL,
            last_migrated_at         TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    ),
    (
        "0002_plugin_states",
        r#"
        CREATE TABLE plugin_states (
            tenant_id INTEGER NOT NULL,
            plugin_id TEXT NOT NULL,
            version   TEXT NOT NULL,
            enabled   INTEGER NOT NULL DEFAULT 1,
            config    TEXT NOT NULL DEFAULT '{}',
            PRIMARY KEY (tenant_id, plugin_id)
        );
        "#,
    ),
    (
        "0003_plugin_permission_grants",
        r#"
        CREATE TABLE plugin_permission_grants (
            tenant_id     INTEGER NOT NULL,
            plugin_id     TEXT NOT NULL,
            user_id       INTEGER NOT NULL,
            ability       TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            resource_id   TEXT NOT NULL,
            granted_by    INTEGER NOT NULL,
            UNIQUE (tenant_id, plugin_id, user_id, ability, resource_type, resource_id)
        );
        CREATE INDEX idx_grants_lookup
            ON plugin_permission_grants (tenant_id, plugin_id, user_id);
        "#,
    ),
];

/// Applies any host migrations not yet recorded in `schema_migrations`.
pub fn apply(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            name       TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let applied: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE name = ?1)",
                [name],
                |row| row.get(0),
            )?;
        if applied {
            continue;
        }
        conn.execute_batch(sql).map_err(|e| {
            DbError::Migration(format!("migration '{name}' failed: {e}"))
        })?;
        conn.execute("INSERT INTO schema_migrations (name) VALUES (?1)", [name])?;
        info!(migration = name, "applied host migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn).unwrap();
        apply(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }
}

//! Persistent per-plugin schema version records.
//!
//! One row per plugin. The version is a monotonically increasing
//! integer written only by the plugin's own migration code; the boot
//! orchestrator reads it and compares against the version the plugin's
//! current code expects. Nothing here bumps the version automatically.

use crate::error::{DbError, DbResult};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

/// Returns the recorded schema version for a plugin, or 0 if the
/// plugin has never recorded one.
pub fn plugin_schema_version(conn: &Connection, plugin_id: &str) -> DbResult<i64> {
    let version = conn
        .query_row(
            "SELECT schema_version FROM plugin_schema_versions WHERE plugin_id = ?1",
            [plugin_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.unwrap_or(0))
}

/// Records a plugin's schema version at the end of one of its
/// migrations. Rejects regressions: the recorded version may only
/// increase.
pub fn set_plugin_schema_version(
    conn: &Connection,
    plugin_id: &str,
    version: i64,
    installed_plugin_version: &str,
    migration_name: &str,
) -> DbResult<()> {
    let recorded = plugin_schema_version(conn, plugin_id)?;
    if version < recorded {
        return Err(DbError::SchemaRegression {
            plugin_id: plugin_id.to_string(),
            recorded,
            attempted: version,
        });
    }
    conn.execute(
        "INSERT INTO plugin_schema_versions
             (plugin_id, schema_version, installed_plugin_version, last_migration_name, last_migrated_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))
         ON CONFLICT (plugin_id) DO UPDATE SET
             schema_version = excluded.schema_version,
             installed_plugin_version = excluded.installed_plugin_version,
             last_migration_name = excluded.last_migration_name,
             last_migrated_at = excluded.last_migrated_at",
        params![plugin_id, version, installed_plugin_version, migration_name],
    )?;
    info!(
        plugin_id,
        schema_version = version,
        migration = migration_name,
        "plugin schema version recorded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbPool;

    #[test]
    fn unrecorded_plugin_is_version_zero() {
        let pool = DbPool::open_in_memory().unwrap();
        let conn = pool.connection().unwrap();
        assert_eq!(plugin_schema_version(&conn, "notes").unwrap(), 0);
    }

    #[test]
    fn set_and_read_back() {
        let pool = DbPool::open_in_memory().unwrap();
        let conn = pool.connection().unwrap();
        set_plugin_schema_version(&conn, "notes", 1, "1.0.0", "0001_create_notes").unwrap();
        assert_eq!(plugin_schema_version(&conn, "notes").unwrap(), 1);

        set_plugin_schema_version(&conn, "notes", 2, "1.1.0", "0002_add_tags").unwrap();
        assert_eq!(plugin_schema_version(&conn, "notes").unwrap(), 2);
    }

    #[test]
    fn regression_rejected() {
        let pool = DbPool::open_in_memory().unwrap();
        let conn = pool.connection().unwrap();
        set_plugin_schema_version(&conn, "notes", 3, "1.2.0", "0003").unwrap();

        let err = set_plugin_schema_version(&conn, "notes", 2, "1.0.0", "0002").unwrap_err();
        assert!(matches!(
            err,
            DbError::SchemaRegression {
                recorded: 3,
                attempted: 2,
                ..
            }
        ));
        // First owner of the record untouched.
        assert_eq!(plugin_schema_version(&conn, "notes").unwrap(), 3);
    }

    #[test]
    fn re_recording_same_version_is_allowed() {
        let pool = DbPool::open_in_memory().unwrap();
        let conn = pool.connection().unwrap();
        set_plugin_schema_version(&conn, "notes", 1, "1.0.0", "0001").unwrap();
        set_plugin_schema_version(&conn, "notes", 1, "1.0.1", "0001").unwrap();
        assert_eq!(plugin_schema_version(&conn, "notes").unwrap(), 1);
    }

    #[test]
    fn versions_are_per_plugin() {
        let pool = DbPool::open_in_memory().unwrap();
        let conn = pool.connection().unwrap();
        set_plugin_schema_version(&conn, "notes", 4, "1.0.0", "0004").unwrap();
        assert_eq!(plugin_schema_version(&conn, "tickets").unwrap(), 0);
    }
}

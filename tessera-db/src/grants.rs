//! Tenant-scoped fine-grained permission grants.
//!
//! A grant ties a user to one plugin-defined ability, optionally
//! narrowed to a single resource. Grants are unique on the full
//! six-tuple; re-granting updates `granted_by` instead of duplicating.

use crate::context::require_tenant_access;
use crate::error::DbResult;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tessera_types::{TenantId, UserId};

/// Persisted permission grant.
///
/// `resource_type`/`resource_id` are empty strings for ability-wide
/// grants; SQLite UNIQUE treats NULLs as distinct, so the sentinel
/// keeps the six-tuple constraint enforceable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginPermissionGrant {
    pub tenant_id: TenantId,
    pub plugin_id: String,
    pub user_id: UserId,
    pub ability: String,
    pub resource_type: String,
    pub resource_id: String,
    pub granted_by: UserId,
}

/// Creates or refreshes a grant (upsert on the six-tuple).
pub fn upsert_grant(conn: &Connection, grant: &PluginPermissionGrant) -> DbResult<()> {
    require_tenant_access(conn, grant.tenant_id)?;
    conn.execute(
        "INSERT INTO plugin_permission_grants
             (tenant_id, plugin_id, user_id, ability, resource_type, resource_id, granted_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (tenant_id, plugin_id, user_id, ability, resource_type, resource_id)
         DO UPDATE SET granted_by = excluded.granted_by",
        params![
            grant.tenant_id.get(),
            grant.plugin_id,
            grant.user_id.get(),
            grant.ability,
            grant.resource_type,
            grant.resource_id,
            grant.granted_by.get(),
        ],
    )?;
    Ok(())
}

/// Removes a grant. Returns true if a row was deleted.
pub fn revoke_grant(conn: &Connection, grant: &PluginPermissionGrant) -> DbResult<bool> {
    require_tenant_access(conn, grant.tenant_id)?;
    let deleted = conn.execute(
        "DELETE FROM plugin_permission_grants
         WHERE tenant_id = ?1 AND plugin_id = ?2 AND user_id = ?3
           AND ability = ?4 AND resource_type = ?5 AND resource_id = ?6",
        params![
            grant.tenant_id.get(),
            grant.plugin_id,
            grant.user_id.get(),
            grant.ability,
            grant.resource_type,
            grant.resource_id,
        ],
    )?;
    Ok(deleted > 0)
}

/// Checks whether a user holds an ability, either ability-wide or for
/// the specific resource. Reads through the row-filter view: no
/// context or the wrong tenant's context sees no grants.
pub fn has_grant(
    conn: &Connection,
    tenant_id: TenantId,
    plugin_id: &str,
    user_id: UserId,
    ability: &str,
    resource_type: &str,
    resource_id: &str,
) -> DbResult<bool> {
    let found: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM visible_plugin_permission_grants
            WHERE tenant_id = ?1 AND plugin_id = ?2 AND user_id = ?3 AND ability = ?4
              AND ((resource_type = '' AND resource_id = '')
                   OR (resource_type = ?5 AND resource_id = ?6))
         )",
        params![
            tenant_id.get(),
            plugin_id,
            user_id.get(),
            ability,
            resource_type,
            resource_id,
        ],
        |row| row.get(0),
    )?;
    Ok(found)
}

/// Lists the grants held by one user for one plugin, via the
/// row-filter view.
pub fn grants_for_user(
    conn: &Connection,
    tenant_id: TenantId,
    plugin_id: &str,
    user_id: UserId,
) -> DbResult<Vec<PluginPermissionGrant>> {
    let mut stmt = conn.prepare(
        "SELECT tenant_id, plugin_id, user_id, ability, resource_type, resource_id, granted_by
         FROM visible_plugin_permission_grants
         WHERE tenant_id = ?1 AND plugin_id = ?2 AND user_id = ?3
         ORDER BY ability, resource_type, resource_id",
    )?;
    let rows = stmt.query_map(
        params![tenant_id.get(), plugin_id, user_id.get()],
        |row| {
            Ok(PluginPermissionGrant {
                tenant_id: TenantId::new(row.get(0)?),
                plugin_id: row.get(1)?,
                user_id: UserId::new(row.get(2)?),
                ability: row.get(3)?,
                resource_type: row.get(4)?,
                resource_id: row.get(5)?,
                granted_by: UserId::new(row.get(6)?),
            })
        },
    )?;
    let mut grants = Vec::new();
    for row in rows {
        grants.push(row?);
    }
    Ok(grants)
}

//! Per-tenant plugin state: enabled flag, installed version, config.
//!
//! State rows are never hard-deleted; disabling a plugin sets
//! `enabled = 0` so that config and history survive re-enabling.
//! All reads go through the `visible_plugin_states` row-filter view,
//! so a caller with no security context (or the wrong tenant's
//! context) sees nothing.

use crate::context::require_tenant_access;
use crate::error::{DbError, DbResult};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tessera_types::TenantId;
use tracing::info;

/// Persisted per-tenant plugin state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginState {
    pub tenant_id: TenantId,
    pub plugin_id: String,
    pub version: String,
    pub enabled: bool,
    pub config: serde_json::Value,
}

/// Enables a plugin for a tenant, creating the state row on first
/// enable. Re-enabling a disabled plugin keeps its stored config.
pub fn enable(
    conn: &Connection,
    tenant_id: TenantId,
    plugin_id: &str,
    version: &str,
) -> DbResult<()> {
    require_tenant_access(conn, tenant_id)?;
    conn.execute(
        "INSERT INTO plugin_states (tenant_id, plugin_id, version, enabled)
         VALUES (?1, ?2, ?3, 1)
         ON CONFLICT (tenant_id, plugin_id) DO UPDATE SET
             enabled = 1,
             version = excluded.version",
        params![tenant_id.get(), plugin_id, version],
    )?;
    info!(tenant_id = %tenant_id, plugin_id, version, "plugin enabled");
    Ok(())
}

/// Disables a plugin for a tenant (soft: the row is kept).
pub fn disable(conn: &Connection, tenant_id: TenantId, plugin_id: &str) -> DbResult<()> {
    require_tenant_access(conn, tenant_id)?;
    let updated = conn.execute(
        "UPDATE plugin_states SET enabled = 0 WHERE tenant_id = ?1 AND plugin_id = ?2",
        params![tenant_id.get(), plugin_id],
    )?;
    if updated == 0 {
        return Err(DbError::PluginStateNotFound {
            tenant_id: tenant_id.get(),
            plugin_id: plugin_id.to_string(),
        });
    }
    info!(tenant_id = %tenant_id, plugin_id, "plugin disabled");
    Ok(())
}

/// Replaces a plugin's per-tenant config blob.
pub fn update_config(
    conn: &Connection,
    tenant_id: TenantId,
    plugin_id: &str,
    config: &serde_json::Value,
) -> DbResult<()> {
    require_tenant_access(conn, tenant_id)?;
    let blob = serde_json::to_string(config)?;
    let updated = conn.execute(
        "UPDATE plugin_states SET config = ?3 WHERE tenant_id = ?1 AND plugin_id = ?2",
        params![tenant_id.get(), plugin_id, blob],
    )?;
    if updated == 0 {
        return Err(DbError::PluginStateNotFound {
            tenant_id: tenant_id.get(),
            plugin_id: plugin_id.to_string(),
        });
    }
    Ok(())
}

/// Fetches a plugin's state for a tenant through the row-filter view.
///
/// Distinguishes "not installed" ([`DbError::PluginStateNotFound`])
/// from "installed but disabled" so callers can message tenants
/// accurately; use [`require_enabled`] for the latter check.
pub fn get(conn: &Connection, tenant_id: TenantId, plugin_id: &str) -> DbResult<PluginState> {
    let row = conn
        .query_row(
            "SELECT tenant_id, plugin_id, version, enabled, config
             FROM visible_plugin_states
             WHERE tenant_id = ?1 AND plugin_id = ?2",
            params![tenant_id.get(), plugin_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((tenant, plugin, version, enabled, config)) = row else {
        return Err(DbError::PluginStateNotFound {
            tenant_id: tenant_id.get(),
            plugin_id: plugin_id.to_string(),
        });
    };
    Ok(PluginState {
        tenant_id: TenantId::new(tenant),
        plugin_id: plugin,
        version,
        enabled,
        config: serde_json::from_str(&config)?,
    })
}

/// Fetches a plugin's state, failing with [`DbError::PluginDisabled`]
/// if the plugin exists for the tenant but is not enabled.
pub fn require_enabled(
    conn: &Connection,
    tenant_id: TenantId,
    plugin_id: &str,
) -> DbResult<PluginState> {
    let state = get(conn, tenant_id, plugin_id)?;
    if !state.enabled {
        return Err(DbError::PluginDisabled {
            tenant_id: tenant_id.get(),
            plugin_id: plugin_id.to_string(),
        });
    }
    Ok(state)
}

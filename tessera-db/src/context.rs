//! Transaction-scoped tenant security context.
//!
//! The context (tenant id, user id) is written into the per-connection
//! TEMP `session_context` table inside the transaction that carries the
//! work, and cleared before commit (rollback discards it with the rest
//! of the transaction). Row-filter views join against `session_context`,
//! so with no open context a filtered query sees zero rows — the
//! fail-closed default.

use crate::error::{DbError, DbResult};
use crate::pool::DbPool;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::sync::Arc;
use tessera_types::{TenantContext, TenantId, UserId};
use tracing::debug;

/// Runs units of work inside context-carrying transactions.
pub struct TenantContextManager {
    pool: Arc<DbPool>,
}

impl TenantContextManager {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Runs `work` inside one transaction whose security context is the
    /// given tenant and user. Both context values are visible before
    /// `work` begins; commit and rollback are atomic with the context's
    /// lifetime.
    pub fn with_tenant_context<T, F>(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        work: F,
    ) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DbResult<T>,
    {
        self.run(TenantContext::new(tenant_id, user_id), work)
    }

    /// Runs `work` under the reserved system identity (tenant 0, user 0),
    /// which row-filter policies special-case to bypass per-tenant
    /// restrictions. For webhooks and scheduled maintenance.
    pub fn with_system_context<T, F>(&self, work: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DbResult<T>,
    {
        self.run(TenantContext::SYSTEM, work)
    }

    fn run<T, F>(&self, ctx: TenantContext, work: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DbResult<T>,
    {
        let mut conn = self.pool.connection()?;
        let tx = conn.transaction()?;

        // One row, set before work begins. The DELETE guards against a
        // previous borrower that died without rolling back.
        tx.execute("DELETE FROM temp.session_context", [])?;
        tx.execute(
            "INSERT INTO temp.session_context (tenant_id, user_id) VALUES (?1, ?2)",
            params![ctx.tenant_id.get(), ctx.user_id.get()],
        )?;
        debug!(tenant_id = %ctx.tenant_id, user_id = %ctx.user_id, "security context opened");

        match work(&tx) {
            Ok(value) => {
                tx.execute("DELETE FROM temp.session_context", [])?;
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                // Rollback discards the context rows along with the work.
                tx.rollback()?;
                Err(e)
            }
        }
    }
}

/// Reads the security context active on this connection, if any.
///
/// Returns `None` outside a context-carrying transaction.
pub fn current_context(conn: &Connection) -> DbResult<Option<TenantContext>> {
    let row = conn
        .query_row(
            "SELECT tenant_id, user_id FROM temp.session_context LIMIT 1",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;
    Ok(row.map(|(tenant, user)| {
        TenantContext::new(TenantId::new(tenant), UserId::new(user))
    }))
}

/// Requires an active security context, failing closed without one.
pub fn require_context(conn: &Connection) -> DbResult<TenantContext> {
    current_context(conn)?.ok_or(DbError::NoActiveContext)
}

/// Requires that the active context may act on rows of `row_tenant`:
/// either the context is the system identity or the tenants match.
pub fn require_tenant_access(conn: &Connection, row_tenant: TenantId) -> DbResult<TenantContext> {
    let ctx = require_context(conn)?;
    if !ctx.is_system() && ctx.tenant_id != row_tenant {
        return Err(DbError::TenantMismatch {
            context_tenant: ctx.tenant_id.get(),
            row_tenant: row_tenant.get(),
        });
    }
    Ok(ctx)
}

//! Tenant context isolation across pooled connections.
//!
//! The core safety invariant: because the security context is
//! transaction-scoped, returning a connection to the pool can never
//! leak one tenant's context into the next borrower.

use std::sync::{Arc, Barrier};
use tessera_db::context::current_context;
use tessera_db::{DbPool, TenantContextManager, grants, plugin_state};
use tessera_types::{TenantId, UserId};

fn manager() -> (Arc<DbPool>, TenantContextManager) {
    let pool = Arc::new(DbPool::open_in_memory().unwrap());
    (Arc::clone(&pool), TenantContextManager::new(pool))
}

#[test]
fn sequential_borrowers_never_see_previous_context() {
    let (pool, mgr) = manager();

    mgr.with_tenant_context(TenantId::new(1), UserId::new(10), |tx| {
        let ctx = current_context(tx)?.unwrap();
        assert_eq!(ctx.tenant_id, TenantId::new(1));
        Ok(())
    })
    .unwrap();

    // The pool holds one connection, so this borrow reuses the exact
    // connection the first context ran on.
    mgr.with_tenant_context(TenantId::new(2), UserId::new(20), |tx| {
        let ctx = current_context(tx)?.unwrap();
        assert_eq!(ctx.tenant_id, TenantId::new(2));
        assert_eq!(ctx.user_id, UserId::new(20));
        Ok(())
    })
    .unwrap();

    // And outside any transaction the connection carries no context.
    let conn = pool.connection().unwrap();
    assert!(current_context(&conn).unwrap().is_none());
}

#[test]
fn concurrent_contexts_on_distinct_connections_do_not_interleave() {
    let (_pool, mgr) = manager();
    let mgr = Arc::new(mgr);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [(1i64, 10i64), (2, 20)]
        .into_iter()
        .map(|(tenant, user)| {
            let mgr = Arc::clone(&mgr);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                mgr.with_tenant_context(TenantId::new(tenant), UserId::new(user), |tx| {
                    // Hold both transactions open at the same time.
                    barrier.wait();
                    let ctx = current_context(tx)?.unwrap();
                    assert_eq!(ctx.tenant_id.get(), tenant);
                    assert_eq!(ctx.user_id.get(), user);
                    barrier.wait();
                    Ok(())
                })
                .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn failed_work_rolls_back_data_and_context_together() {
    let (pool, mgr) = manager();
    let t = TenantId::new(1);

    let result: tessera_db::DbResult<()> =
        mgr.with_tenant_context(t, UserId::new(1), |tx| {
            plugin_state::enable(tx, t, "notes", "1.0.0")?;
            Err(tessera_db::DbError::Migration("boom".into()))
        });
    assert!(result.is_err());

    // The enable was rolled back with the transaction.
    let err = mgr
        .with_tenant_context(t, UserId::new(1), |tx| plugin_state::get(tx, t, "notes"))
        .unwrap_err();
    assert!(matches!(
        err,
        tessera_db::DbError::PluginStateNotFound { .. }
    ));

    let conn = pool.connection().unwrap();
    assert!(current_context(&conn).unwrap().is_none());
}

#[test]
fn row_filters_fail_closed_without_context() {
    let (pool, mgr) = manager();
    let t = TenantId::new(1);
    mgr.with_tenant_context(t, UserId::new(1), |tx| {
        grants::upsert_grant(
            tx,
            &grants::PluginPermissionGrant {
                tenant_id: t,
                plugin_id: "notes".into(),
                user_id: UserId::new(7),
                ability: "notes.note.write".into(),
                resource_type: String::new(),
                resource_id: String::new(),
                granted_by: UserId::new(1),
            },
        )
    })
    .unwrap();

    // Raw connection, no open context: the filter view joins against an
    // empty session_context and returns nothing.
    let conn = pool.connection().unwrap();
    let visible: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM visible_plugin_permission_grants",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(visible, 0);

    // The underlying table does hold the row.
    let total: i64 = conn
        .query_row("SELECT COUNT(*) FROM plugin_permission_grants", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(total, 1);
}

#[test]
fn system_context_bypasses_tenant_filter() {
    let (_pool, mgr) = manager();
    for tenant in [1i64, 2, 3] {
        let t = TenantId::new(tenant);
        mgr.with_tenant_context(t, UserId::new(1), |tx| {
            plugin_state::enable(tx, t, "notes", "1.0.0")
        })
        .unwrap();
    }

    mgr.with_system_context(|tx| {
        let visible: i64 = tx.query_row(
            "SELECT COUNT(*) FROM visible_plugin_states",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(visible, 3);
        Ok(())
    })
    .unwrap();

    // A tenant context sees only its own row.
    mgr.with_tenant_context(TenantId::new(2), UserId::new(5), |tx| {
        let visible: i64 = tx.query_row(
            "SELECT COUNT(*) FROM visible_plugin_states",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(visible, 1);
        Ok(())
    })
    .unwrap();
}

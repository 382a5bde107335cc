//! SQLite connection management and tenant isolation for tessera.
//!
//! Every operation that touches tenant data runs inside a single
//! transaction whose security context (tenant id, user id) is written
//! into a per-connection TEMP table at transaction start and discarded
//! with the transaction. Because the context is transaction-scoped,
//! returning a connection to the pool can never leak one tenant's
//! context into the next borrower.
//!
//! # Architecture
//!
//! - [`DbPool`] hands out pooled connections with the context table
//!   and row-filter views installed
//! - [`TenantContextManager`] wraps work in a context-carrying
//!   transaction ([`TenantContextManager::with_tenant_context`],
//!   [`TenantContextManager::with_system_context`])
//! - `schema_gate` persists the per-plugin monotonic schema version
//! - `plugin_state` persists per-tenant enable/disable/config state
//! - `grants` persists tenant-scoped fine-grained permission grants

pub mod context;
mod error;
pub mod grants;
mod migrations;
pub mod plugin_state;
mod pool;
pub mod schema_gate;

pub use context::TenantContextManager;
pub use error::{DbError, DbResult};
pub use plugin_state::PluginState;
pub use pool::{DbPool, PooledConnection};

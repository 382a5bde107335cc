//! Error types for the database layer.

use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error (config blobs).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A tenant-scoped operation ran with no active security context.
    #[error("no active security context; wrap the operation in with_tenant_context or with_system_context")]
    NoActiveContext,

    /// A row's tenant does not match the transaction's security context.
    #[error("tenant mismatch: context is tenant {context_tenant}, row belongs to tenant {row_tenant}")]
    TenantMismatch {
        context_tenant: i64,
        row_tenant: i64,
    },

    /// Plugin has no state row for this tenant.
    #[error("plugin '{plugin_id}' is not installed for tenant {tenant_id}")]
    PluginStateNotFound { tenant_id: i64, plugin_id: String },

    /// Plugin exists for this tenant but is disabled.
    #[error("plugin '{plugin_id}' is disabled for tenant {tenant_id}")]
    PluginDisabled { tenant_id: i64, plugin_id: String },

    /// Attempt to lower a plugin's recorded schema version.
    #[error("schema version for plugin '{plugin_id}' may not decrease: recorded {recorded}, attempted {attempted}")]
    SchemaRegression {
        plugin_id: String,
        recorded: i64,
        attempted: i64,
    },
}

//! Error types for the plugin host.

use std::fmt;
use thiserror::Error;

/// Boot phase in which a plugin-scoped failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootPhase {
    Validation,
    Capabilities,
    Routes,
    Hooks,
    Authz,
}

impl fmt::Display for BootPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Capabilities => "capabilities",
            Self::Routes => "routes",
            Self::Hooks => "hooks",
            Self::Authz => "authz",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PluginHostError {
    /// Fatal: the plugin's recorded schema version does not match what
    /// its code expects. The only error that terminates the process.
    #[error(
        "schema version mismatch for plugin '{plugin_id}': code expects {expected}, database \
         has {actual}; run the plugin's migrations (or roll back the deployment) before starting"
    )]
    SchemaMismatch {
        plugin_id: String,
        expected: i64,
        actual: i64,
    },

    /// A plugin-scoped boot failure; quarantines the plugin, never the
    /// process.
    #[error("plugin '{plugin_id}' failed to boot in phase {phase}: {message}")]
    Boot {
        plugin_id: String,
        phase: BootPhase,
        message: String,
    },

    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    #[error("plugin '{0}' is disabled")]
    PluginDisabled(String),

    #[error("capability denied: plugin '{plugin_id}' lacks '{capability}': {reason}")]
    CapabilityDenied {
        plugin_id: String,
        capability: String,
        reason: String,
    },

    #[error("plugin '{0}' is quarantined and excluded from serving requests")]
    Quarantined(String),

    #[error(
        "resource type '{resource_type}' is already registered by plugin '{existing_owner}'; \
         rejected conflicting registration from '{new_owner}'"
    )]
    ResourceTypeConflict {
        resource_type: String,
        existing_owner: String,
        new_owner: String,
    },

    #[error("invalid manifest for plugin '{plugin_id}': {message}")]
    InvalidManifest { plugin_id: String, message: String },

    #[error("failed to parse plugin manifest: {0}")]
    ManifestParse(String),

    #[error("boot orchestrator has already run; re-running mid-process is not supported")]
    AlreadyBooted,

    #[error("database error: {0}")]
    Database(#[from] tessera_db::DbError),
}

impl PluginHostError {
    /// Constructs a plugin-scoped boot failure.
    pub fn boot(plugin_id: impl Into<String>, phase: BootPhase, message: impl Into<String>) -> Self {
        Self::Boot {
            plugin_id: plugin_id.into(),
            phase,
            message: message.into(),
        }
    }
}

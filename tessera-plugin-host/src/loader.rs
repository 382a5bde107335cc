//! Plugin loading abstraction.
//!
//! The boot orchestrator never imports plugin code directly; it asks a
//! [`PluginLoader`] for the [`PluginModule`] behind a plugin id, so
//! the loading strategy (compiled registry, filesystem scan) is
//! swappable without touching the orchestrator. [`StaticLoader`] is
//! the shipped compiled-registry strategy.

use crate::abilities::AbilityDefinition;
use crate::error::PluginHostError;
use crate::resources::ResourceProvider;
use std::collections::HashMap;
use std::sync::Arc;

/// What a loaded plugin exposes to the boot orchestrator.
pub trait PluginModule: Send + Sync {
    /// Schema version this plugin's code expects to find recorded in
    /// the database. 0 for plugins with no tables of their own.
    fn expected_schema_version(&self) -> i64;

    /// Abilities to register under the plugin's namespace.
    fn abilities(&self) -> Vec<AbilityDefinition> {
        Vec::new()
    }

    /// Resource providers to register.
    fn resource_providers(&self) -> Vec<Arc<dyn ResourceProvider>> {
        Vec::new()
    }

    /// Route prefixes to mount, absolute, under the plugin's base
    /// prefix.
    fn route_prefixes(&self) -> Vec<String> {
        Vec::new()
    }

    /// One-time boot hook, run after registration and before route
    /// mounting. An `Err` quarantines the plugin.
    fn on_boot(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Resolves a plugin id to its module.
pub trait PluginLoader {
    fn load(&self, plugin_id: &str) -> Result<Arc<dyn PluginModule>, PluginHostError>;
}

/// Compiled-in plugin registry.
#[derive(Default)]
pub struct StaticLoader {
    modules: HashMap<String, Arc<dyn PluginModule>>,
}

impl StaticLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module under a plugin id, replacing any previous
    /// registration for that id.
    pub fn register(&mut self, plugin_id: &str, module: Arc<dyn PluginModule>) {
        self.modules.insert(plugin_id.to_string(), module);
    }
}

impl PluginLoader for StaticLoader {
    fn load(&self, plugin_id: &str) -> Result<Arc<dyn PluginModule>, PluginHostError> {
        self.modules
            .get(plugin_id)
            .cloned()
            .ok_or_else(|| PluginHostError::PluginNotFound(plugin_id.to_string()))
    }
}

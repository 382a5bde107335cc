//! Per-plugin ability namespace.
//!
//! Abilities are the fine-grained permission strings a plugin declares
//! for its own authorization model (e.g. `notes.note.write`). Every
//! ability id must live under the owning plugin's namespace prefix;
//! registration is batch-atomic and idempotent per id.

use crate::error::{BootPhase, PluginHostError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A plugin-declared ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    /// Namespaced id, `"<pluginId>.<segment>[.<segment>...]"`.
    pub id: String,
    pub description: String,
    /// Resource type this ability applies to, for resource-scoped
    /// grants.
    #[serde(default)]
    pub resource_type: Option<String>,
}

/// Registry of ability definitions, keyed by owning plugin.
///
/// Mutated only during single-threaded boot; read-only once request
/// traffic begins.
#[derive(Debug, Default)]
pub struct AbilityRegistry {
    by_plugin: HashMap<String, BTreeMap<String, AbilityDefinition>>,
}

impl AbilityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a batch of abilities for a plugin.
    ///
    /// All-or-nothing: every definition is validated before any is
    /// committed, so a bad batch leaves the registry untouched.
    /// Re-registering an id the plugin already owns replaces its
    /// definition.
    pub fn register_abilities(
        &mut self,
        plugin_id: &str,
        abilities: Vec<AbilityDefinition>,
    ) -> Result<(), PluginHostError> {
        let prefix = format!("{plugin_id}.");
        for ability in &abilities {
            let reject = |message: String| {
                PluginHostError::boot(plugin_id, BootPhase::Capabilities, message)
            };
            if !ability.id.starts_with(&prefix) || ability.id.len() == prefix.len() {
                return Err(reject(format!(
                    "ability '{}' is outside the plugin's namespace (must start with '{prefix}')",
                    ability.id
                )));
            }
            if ability.id.contains(':') {
                return Err(reject(format!(
                    "ability '{}' must not contain ':'",
                    ability.id
                )));
            }
            if ability.description.trim().is_empty() {
                return Err(reject(format!(
                    "ability '{}' has an empty description",
                    ability.id
                )));
            }
        }

        let entry = self.by_plugin.entry(plugin_id.to_string()).or_default();
        for ability in abilities {
            entry.insert(ability.id.clone(), ability);
        }
        Ok(())
    }

    /// Returns a plugin's abilities, in id order.
    #[must_use]
    pub fn abilities_for(&self, plugin_id: &str) -> Vec<&AbilityDefinition> {
        self.by_plugin
            .get(plugin_id)
            .map(|defs| defs.values().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_ability(&self, plugin_id: &str, id: &str) -> bool {
        self.by_plugin
            .get(plugin_id)
            .is_some_and(|defs| defs.contains_key(id))
    }

    /// Clears one plugin's abilities, or all of them.
    pub fn clear(&mut self, plugin_id: Option<&str>) {
        match plugin_id {
            Some(id) => {
                self.by_plugin.remove(id);
            }
            None => self.by_plugin.clear(),
        }
    }
}

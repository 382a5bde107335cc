//! Resource-type ownership registry.
//!
//! Maps each resource-type name to exactly one owning plugin provider.
//! A second plugin claiming an already-owned type is a boot-time
//! configuration error, never a silent overwrite; probing an
//! unregistered type is not an error, because callers resolve
//! optimistically.

use crate::error::PluginHostError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tessera_types::TenantContext;

/// Declares a resource type and its owning plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeDefinition {
    pub resource_type: String,
    pub owner_plugin_id: String,
}

/// Resolved metadata for one resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceMeta {
    pub resource_type: String,
    pub resource_id: String,
    pub owner_plugin_id: String,
    pub display_name: Option<String>,
}

/// Implemented by a plugin to expose the resource types it owns.
pub trait ResourceProvider: Send + Sync {
    /// Owning plugin id.
    fn plugin_id(&self) -> &str;

    /// Resource-type names this provider owns.
    fn resource_types(&self) -> Vec<String>;

    /// Resolves one resource under the given security context.
    /// `None` means the resource does not exist (or is not visible to
    /// this context).
    fn resolve(&self, resource_type: &str, id: &str, ctx: &TenantContext)
    -> Option<ResourceMeta>;
}

/// Registry mapping resource-type names to their owning provider.
///
/// Mutated only during single-threaded boot; read-only once request
/// traffic begins.
#[derive(Default)]
pub struct ResourceProviderRegistry {
    by_type: HashMap<String, Arc<dyn ResourceProvider>>,
}

impl ResourceProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider for every resource type it declares.
    ///
    /// A type already owned by a different plugin fails the whole
    /// registration and leaves the existing owner's mapping untouched.
    /// Re-registering a type under the same plugin is idempotent.
    pub fn register(&mut self, provider: Arc<dyn ResourceProvider>) -> Result<(), PluginHostError> {
        let new_owner = provider.plugin_id().to_string();
        let types = provider.resource_types();

        for resource_type in &types {
            if let Some(existing) = self.by_type.get(resource_type)
                && existing.plugin_id() != new_owner
            {
                return Err(PluginHostError::ResourceTypeConflict {
                    resource_type: resource_type.clone(),
                    existing_owner: existing.plugin_id().to_string(),
                    new_owner,
                });
            }
        }
        for resource_type in types {
            self.by_type.insert(resource_type, Arc::clone(&provider));
        }
        Ok(())
    }

    /// Returns the provider owning a resource type, if any.
    #[must_use]
    pub fn get_provider(&self, resource_type: &str) -> Option<&Arc<dyn ResourceProvider>> {
        self.by_type.get(resource_type)
    }

    /// Returns the plugin id owning a resource type, if any.
    #[must_use]
    pub fn owner_of(&self, resource_type: &str) -> Option<&str> {
        self.by_type.get(resource_type).map(|p| p.plugin_id())
    }

    /// Resolves a resource; `None` for unregistered types.
    #[must_use]
    pub fn resolve(
        &self,
        resource_type: &str,
        id: &str,
        ctx: &TenantContext,
    ) -> Option<ResourceMeta> {
        self.by_type
            .get(resource_type)?
            .resolve(resource_type, id, ctx)
    }

    /// Whether a resource exists; false for unregistered types.
    #[must_use]
    pub fn exists(&self, resource_type: &str, id: &str, ctx: &TenantContext) -> bool {
        self.resolve(resource_type, id, ctx).is_some()
    }

    /// Lists every registered resource type with its owner, in type
    /// order. For admin tooling.
    #[must_use]
    pub fn definitions(&self) -> Vec<ResourceTypeDefinition> {
        let mut defs: Vec<ResourceTypeDefinition> = self
            .by_type
            .iter()
            .map(|(resource_type, provider)| ResourceTypeDefinition {
                resource_type: resource_type.clone(),
                owner_plugin_id: provider.plugin_id().to_string(),
            })
            .collect();
        defs.sort_by(|a, b| a.resource_type.cmp(&b.resource_type));
        defs
    }

    /// Removes every type owned by one plugin (quarantine rollback).
    pub fn clear_plugin(&mut self, plugin_id: &str) {
        self.by_type.retain(|_, p| p.plugin_id() != plugin_id);
    }

    /// Empties the registry.
    pub fn clear(&mut self) {
        self.by_type.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::{TenantId, UserId};

    /// Provider that resolves a fixed set of ids.
    struct FixedProvider {
        plugin_id: String,
        types: Vec<String>,
        known_ids: Vec<String>,
    }

    impl FixedProvider {
        fn new(plugin_id: &str, types: &[&str], known_ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                plugin_id: plugin_id.into(),
                types: types.iter().map(|s| (*s).to_string()).collect(),
                known_ids: known_ids.iter().map(|s| (*s).to_string()).collect(),
            })
        }
    }

    impl ResourceProvider for FixedProvider {
        fn plugin_id(&self) -> &str {
            &self.plugin_id
        }

        fn resource_types(&self) -> Vec<String> {
            self.types.clone()
        }

        fn resolve(
            &self,
            resource_type: &str,
            id: &str,
            _ctx: &TenantContext,
        ) -> Option<ResourceMeta> {
            self.known_ids.iter().any(|k| k == id).then(|| ResourceMeta {
                resource_type: resource_type.to_string(),
                resource_id: id.to_string(),
                owner_plugin_id: self.plugin_id.clone(),
                display_name: None,
            })
        }
    }

    fn ctx() -> TenantContext {
        TenantContext::new(TenantId::new(1), UserId::new(1))
    }

    #[test]
    fn register_and_resolve() {
        let mut reg = ResourceProviderRegistry::new();
        reg.register(FixedProvider::new("support", &["ticket"], &["t-1"]))
            .unwrap();

        assert_eq!(reg.owner_of("ticket"), Some("support"));
        let meta = reg.resolve("ticket", "t-1", &ctx()).unwrap();
        assert_eq!(meta.owner_plugin_id, "support");
        assert!(reg.exists("ticket", "t-1", &ctx()));
        assert!(!reg.exists("ticket", "t-2", &ctx()));
    }

    #[test]
    fn collision_names_both_owners_and_keeps_first() {
        let mut reg = ResourceProviderRegistry::new();
        reg.register(FixedProvider::new("support", &["ticket"], &["t-1"]))
            .unwrap();

        let err = reg
            .register(FixedProvider::new("crm", &["ticket"], &["c-1"]))
            .unwrap_err();
        match err {
            PluginHostError::ResourceTypeConflict {
                resource_type,
                existing_owner,
                new_owner,
            } => {
                assert_eq!(resource_type, "ticket");
                assert_eq!(existing_owner, "support");
                assert_eq!(new_owner, "crm");
            }
            other => panic!("unexpected error: {other}"),
        }
        // First owner's mapping unaffected.
        assert_eq!(reg.owner_of("ticket"), Some("support"));
        assert!(reg.exists("ticket", "t-1", &ctx()));
    }

    #[test]
    fn conflicting_batch_commits_nothing() {
        let mut reg = ResourceProviderRegistry::new();
        reg.register(FixedProvider::new("support", &["ticket"], &["t-1"]))
            .unwrap();

        // "contact" is free, but the batch also claims "ticket".
        let err = reg.register(FixedProvider::new("crm", &["contact", "ticket"], &[]));
        assert!(err.is_err());
        assert_eq!(reg.owner_of("contact"), None);
    }

    #[test]
    fn same_owner_reregistration_is_idempotent() {
        let mut reg = ResourceProviderRegistry::new();
        reg.register(FixedProvider::new("support", &["ticket"], &["t-1"]))
            .unwrap();
        reg.register(FixedProvider::new("support", &["ticket"], &["t-1", "t-2"]))
            .unwrap();
        assert!(reg.exists("ticket", "t-2", &ctx()));
    }

    #[test]
    fn unregistered_type_probes_do_not_error() {
        let reg = ResourceProviderRegistry::new();
        assert!(reg.resolve("ghost", "g-1", &ctx()).is_none());
        assert!(!reg.exists("ghost", "g-1", &ctx()));
        assert!(reg.get_provider("ghost").is_none());
    }

    #[test]
    fn definitions_list_types_with_owners() {
        let mut reg = ResourceProviderRegistry::new();
        reg.register(FixedProvider::new("support", &["ticket"], &[]))
            .unwrap();
        reg.register(FixedProvider::new("crm", &["contact", "company"], &[]))
            .unwrap();

        let defs = reg.definitions();
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].resource_type, "company");
        assert_eq!(defs[0].owner_plugin_id, "crm");
        assert_eq!(defs[2].resource_type, "ticket");
        assert_eq!(defs[2].owner_plugin_id, "support");
    }

    #[test]
    fn clear_plugin_removes_only_that_owner() {
        let mut reg = ResourceProviderRegistry::new();
        reg.register(FixedProvider::new("support", &["ticket"], &[]))
            .unwrap();
        reg.register(FixedProvider::new("crm", &["contact"], &[]))
            .unwrap();

        reg.clear_plugin("support");
        assert_eq!(reg.owner_of("ticket"), None);
        assert_eq!(reg.owner_of("contact"), Some("crm"));
    }
}

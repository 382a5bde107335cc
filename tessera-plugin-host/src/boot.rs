//! One-time plugin boot orchestration.
//!
//! Drives each plugin through `pending → booting → {active |
//! quarantined | disabled}`. Every plugin's outcome is independent —
//! one plugin's defect must never prevent the rest of the system from
//! starting — with a single exception: a schema version mismatch
//! aborts the whole boot, because serving traffic against an
//! incompatible schema risks data corruption. All schema versions are
//! verified before any plugin activates.
//!
//! The orchestrator owns the ability, resource, and route registries
//! and mutates them only here, during the single-threaded boot phase;
//! request handlers receive them read-only.

use crate::abilities::AbilityRegistry;
use crate::capabilities::{self, CapabilityCheck, CapabilityGrantDecision};
use crate::error::{BootPhase, PluginHostError};
use crate::loader::{PluginLoader, PluginModule};
use crate::manifest::PluginManifest;
use crate::resources::ResourceProviderRegistry;
use crate::routes::{RouteTable, plugin_base_prefix};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tessera_db::{DbPool, schema_gate};
use tracing::{error, info, warn};

/// Lifecycle state of one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    Pending,
    Booting,
    Active,
    Quarantined,
    Disabled,
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Booting => "booting",
            Self::Active => "active",
            Self::Quarantined => "quarantined",
            Self::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// Authoritative per-plugin boot outcome.
#[derive(Debug)]
pub struct PluginRecord {
    pub manifest: PluginManifest,
    pub status: PluginStatus,
    /// Grant decision, present once the plugin reaches `Active`.
    pub decision: Option<CapabilityGrantDecision>,
    /// Phase and message of the failure that caused quarantine.
    pub failure: Option<(BootPhase, String)>,
}

/// Summary of a completed boot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootReport {
    pub active: Vec<String>,
    pub quarantined: Vec<String>,
    pub disabled: Vec<String>,
}

/// Boots all known plugins once at process start. Not re-entrant.
pub struct BootOrchestrator {
    loader: Box<dyn PluginLoader>,
    db: Arc<DbPool>,
    abilities: AbilityRegistry,
    resources: ResourceProviderRegistry,
    routes: RouteTable,
    plugins: BTreeMap<String, PluginRecord>,
    booted: bool,
}

impl BootOrchestrator {
    pub fn new(loader: Box<dyn PluginLoader>, db: Arc<DbPool>) -> Self {
        Self {
            loader,
            db,
            abilities: AbilityRegistry::new(),
            resources: ResourceProviderRegistry::new(),
            routes: RouteTable::new(),
            plugins: BTreeMap::new(),
            booted: false,
        }
    }

    /// Runs the startup sequence over every manifest.
    ///
    /// Returns `Err` only for conditions that must stop the process:
    /// a schema version mismatch, a database failure while verifying
    /// versions, or a repeated call. Per-plugin failures land in the
    /// report as quarantines.
    pub fn boot(
        &mut self,
        manifests: Vec<PluginManifest>,
    ) -> Result<BootReport, PluginHostError> {
        if self.booted {
            return Err(PluginHostError::AlreadyBooted);
        }
        self.booted = true;

        let modules = self.verify_schema_versions(&manifests)?;

        let mut report = BootReport::default();
        for manifest in manifests {
            let plugin_id = manifest.plugin_id.clone();
            if self.plugins.contains_key(&plugin_id) {
                warn!(plugin_id = %plugin_id, "duplicate manifest ignored");
                continue;
            }

            if !manifest.is_enabled() {
                info!(plugin_id = %plugin_id, "plugin disabled by feature flag");
                report.disabled.push(plugin_id.clone());
                self.plugins.insert(plugin_id, PluginRecord {
                    manifest,
                    status: PluginStatus::Disabled,
                    decision: None,
                    failure: None,
                });
                continue;
            }

            let mut record = PluginRecord {
                manifest,
                status: PluginStatus::Booting,
                decision: None,
                failure: None,
            };
            match self.boot_one(&record.manifest, modules.get(&plugin_id)) {
                Ok(decision) => {
                    info!(
                        plugin_id = %plugin_id,
                        granted = decision.granted.len(),
                        denied = decision.denied.len(),
                        "plugin active"
                    );
                    record.status = PluginStatus::Active;
                    record.decision = Some(decision);
                    report.active.push(plugin_id.clone());
                }
                Err(err) => {
                    let (phase, message) = match err {
                        PluginHostError::Boot { phase, message, .. } => (phase, message),
                        other => (BootPhase::Validation, other.to_string()),
                    };
                    warn!(
                        plugin_id = %plugin_id,
                        phase = %phase,
                        "plugin quarantined: {message}"
                    );
                    // Remove any partial registration so the registries
                    // stay consistent for the remaining plugins.
                    self.abilities.clear(Some(&plugin_id));
                    self.resources.clear_plugin(&plugin_id);
                    self.routes.unmount(&plugin_id);
                    record.status = PluginStatus::Quarantined;
                    record.failure = Some((phase, message));
                    report.quarantined.push(plugin_id.clone());
                }
            }
            self.plugins.insert(plugin_id, record);
        }

        info!(
            active = report.active.len(),
            quarantined = report.quarantined.len(),
            disabled = report.disabled.len(),
            "plugin boot complete"
        );
        Ok(report)
    }

    /// Compares every loadable plugin's expected schema version with
    /// the recorded one before anything activates. A mismatch is the
    /// one fatal, process-level boot failure.
    fn verify_schema_versions(
        &self,
        manifests: &[PluginManifest],
    ) -> Result<HashMap<String, Arc<dyn PluginModule>>, PluginHostError> {
        let mut modules = HashMap::new();
        let conn = self.db.connection()?;
        for manifest in manifests {
            if !manifest.is_enabled() || manifest.validate().is_err() {
                continue;
            }
            // A plugin whose module cannot load is quarantined later;
            // it has no schema expectation to verify.
            let Ok(module) = self.loader.load(&manifest.plugin_id) else {
                continue;
            };
            let expected = module.expected_schema_version();
            let actual = schema_gate::plugin_schema_version(&conn, &manifest.plugin_id)?;
            if expected != actual {
                error!(
                    plugin_id = %manifest.plugin_id,
                    expected,
                    actual,
                    "schema version mismatch"
                );
                return Err(PluginHostError::SchemaMismatch {
                    plugin_id: manifest.plugin_id.clone(),
                    expected,
                    actual,
                });
            }
            modules.insert(manifest.plugin_id.clone(), module);
        }
        Ok(modules)
    }

    fn boot_one(
        &mut self,
        manifest: &PluginManifest,
        module: Option<&Arc<dyn PluginModule>>,
    ) -> Result<CapabilityGrantDecision, PluginHostError> {
        let plugin_id = &manifest.plugin_id;

        manifest.validate().map_err(|e| {
            PluginHostError::boot(plugin_id, BootPhase::Validation, e.to_string())
        })?;
        let module = module.ok_or_else(|| {
            PluginHostError::boot(
                plugin_id,
                BootPhase::Validation,
                "plugin module is not registered with the loader",
            )
        })?;

        let errors = capabilities::validate_manifest_capabilities(manifest);
        if !errors.is_empty() {
            return Err(PluginHostError::boot(
                plugin_id,
                BootPhase::Capabilities,
                errors.join("; "),
            ));
        }
        let decision = capabilities::decide_grants(manifest);

        self.abilities
            .register_abilities(plugin_id, module.abilities())?;

        for provider in module.resource_providers() {
            self.resources.register(provider).map_err(|e| {
                PluginHostError::boot(plugin_id, BootPhase::Authz, e.to_string())
            })?;
        }

        module
            .on_boot()
            .map_err(|message| PluginHostError::boot(plugin_id, BootPhase::Hooks, message))?;

        let mut prefixes = module.route_prefixes();
        if prefixes.is_empty() {
            prefixes.push(plugin_base_prefix(plugin_id));
        }
        self.routes.mount(plugin_id, prefixes)?;

        Ok(decision)
    }

    // ================================================================
    // Read-only surface for request handling
    // ================================================================

    #[must_use]
    pub fn status(&self, plugin_id: &str) -> Option<PluginStatus> {
        self.plugins.get(plugin_id).map(|r| r.status)
    }

    #[must_use]
    pub fn record(&self, plugin_id: &str) -> Option<&PluginRecord> {
        self.plugins.get(plugin_id)
    }

    /// Errors unless the plugin booted to `Active`, distinguishing
    /// "does not exist" from "disabled" from "quarantined" so callers
    /// can message tenants accurately.
    pub fn ensure_active(&self, plugin_id: &str) -> Result<(), PluginHostError> {
        match self.status(plugin_id) {
            Some(PluginStatus::Active) => Ok(()),
            Some(PluginStatus::Quarantined) => {
                Err(PluginHostError::Quarantined(plugin_id.to_string()))
            }
            Some(PluginStatus::Disabled) => {
                Err(PluginHostError::PluginDisabled(plugin_id.to_string()))
            }
            _ => Err(PluginHostError::PluginNotFound(plugin_id.to_string())),
        }
    }

    /// Capabilities granted to an active plugin; empty otherwise.
    #[must_use]
    pub fn granted_capabilities(&self, plugin_id: &str) -> &[String] {
        self.plugins
            .get(plugin_id)
            .and_then(|r| r.decision.as_ref())
            .map(|d| d.granted.as_slice())
            .unwrap_or_default()
    }

    /// Runtime capability check. Fail-closed: plugins that are absent,
    /// quarantined, or disabled hold no capabilities at all.
    #[must_use]
    pub fn check_capability(&self, plugin_id: &str, capability: &str) -> CapabilityCheck {
        match self.status(plugin_id) {
            Some(PluginStatus::Active) => {
                capabilities::check(plugin_id, capability, self.granted_capabilities(plugin_id))
            }
            Some(PluginStatus::Quarantined) => {
                CapabilityCheck::deny(format!("plugin '{plugin_id}' is quarantined"))
            }
            Some(PluginStatus::Disabled) => {
                CapabilityCheck::deny(format!("plugin '{plugin_id}' is disabled"))
            }
            _ => CapabilityCheck::deny(format!("plugin '{plugin_id}' is not registered")),
        }
    }

    /// Same decision as [`check_capability`](Self::check_capability),
    /// surfaced as a typed error for call sites that gate an operation
    /// rather than report a decision.
    pub fn require_capability(
        &self,
        plugin_id: &str,
        capability: &str,
    ) -> Result<(), PluginHostError> {
        let result = self.check_capability(plugin_id, capability);
        if result.allowed {
            Ok(())
        } else {
            Err(PluginHostError::CapabilityDenied {
                plugin_id: plugin_id.to_string(),
                capability: capability.to_string(),
                reason: result.reason.unwrap_or_else(|| "denied".to_string()),
            })
        }
    }

    #[must_use]
    pub fn abilities(&self) -> &AbilityRegistry {
        &self.abilities
    }

    #[must_use]
    pub fn resources(&self) -> &ResourceProviderRegistry {
        &self.resources
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

/// Logs a structured fatal message and terminates the process with a
/// non-zero exit status. The short delay lets tracing subscribers
/// flush before exit. This is the only external signal of a schema
/// mismatch: no retry, no partial start.
pub fn abort_for_schema_mismatch(err: &PluginHostError) -> ! {
    if let PluginHostError::SchemaMismatch {
        plugin_id,
        expected,
        actual,
    } = err
    {
        error!(
            plugin_id = %plugin_id,
            expected,
            actual,
            "fatal: schema version mismatch, refusing to serve traffic"
        );
    } else {
        error!("fatal boot error: {err}");
    }
    std::thread::sleep(std::time::Duration::from_millis(200));
    std::process::exit(1);
}

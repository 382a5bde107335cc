//! Capability catalog and the fail-closed capability enforcer.
//!
//! Catalog capabilities use the form `app:<resource>:<action>` and each
//! carries the minimum tier allowed to request it. Plugin-private
//! capabilities use the form `<pluginId>.<name>` and are valid only for
//! tiers B and main-app.
//!
//! Every function here is a pure decision: no state is mutated, so the
//! enforcer is safe to call from any number of concurrent callers.
//! Absence of a capability in the granted list is always a deny —
//! there is no default-allow path.

use crate::manifest::PluginManifest;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Trust tier of a plugin, in increasing order of trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    A,
    B,
    C,
    MainApp,
}

impl Tier {
    /// Returns true if this tier meets `required` (trust is ordered
    /// A < B < C < main-app).
    #[must_use]
    pub fn allows(&self, required: Tier) -> bool {
        *self >= required
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::MainApp => "main-app",
        };
        f.write_str(name)
    }
}

/// A capability in the fixed catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    DbRead,
    DbWrite,
    DbMigrate,
    Routes,
    Authz,
    Hooks,
    Jobs,
    HttpOutbound,
    BillingRead,
    TenantsRead,
}

impl Capability {
    /// All catalog capabilities.
    pub const ALL: &'static [Capability] = &[
        Self::DbRead,
        Self::DbWrite,
        Self::DbMigrate,
        Self::Routes,
        Self::Authz,
        Self::Hooks,
        Self::Jobs,
        Self::HttpOutbound,
        Self::BillingRead,
        Self::TenantsRead,
    ];

    /// Returns the wire identifier for this capability.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::DbRead => "app:db:read",
            Self::DbWrite => "app:db:write",
            Self::DbMigrate => "app:db:migrate",
            Self::Routes => "app:routes",
            Self::Authz => "app:authz",
            Self::Hooks => "app:hooks",
            Self::Jobs => "app:jobs",
            Self::HttpOutbound => "app:http:outbound",
            Self::BillingRead => "app:billing:read",
            Self::TenantsRead => "app:tenants:read",
        }
    }

    /// Returns the minimum tier allowed to request this capability.
    #[must_use]
    pub fn minimum_tier(&self) -> Tier {
        match self {
            Self::DbRead | Self::Routes => Tier::A,
            Self::DbWrite | Self::DbMigrate | Self::Authz | Self::Hooks => Tier::B,
            Self::Jobs | Self::HttpOutbound => Tier::C,
            Self::BillingRead | Self::TenantsRead => Tier::MainApp,
        }
    }

    /// Looks up a capability in the catalog by its wire identifier.
    #[must_use]
    pub fn parse(identifier: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|cap| cap.identifier() == identifier)
    }
}

/// Outcome of a single capability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityCheck {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl CapabilityCheck {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Per-manifest grant decision, recomputed at every boot and never
/// persisted. `granted` and `denied` exactly partition the distinct
/// capabilities of the request list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapabilityGrantDecision {
    pub granted: Vec<String>,
    pub denied: Vec<String>,
    /// Denial reasons, keyed by capability.
    pub reasons: HashMap<String, String>,
}

/// Returns true if `capability` is a well-formed plugin-private
/// capability for `plugin_id` (`"<pluginId>.<name>"`, no `:`).
#[must_use]
pub fn is_plugin_private(plugin_id: &str, capability: &str) -> bool {
    match capability
        .strip_prefix(plugin_id)
        .and_then(|rest| rest.strip_prefix('.'))
    {
        Some(name) => !name.is_empty() && !name.contains(':'),
        None => false,
    }
}

/// Checks whether a plugin holds one capability.
///
/// Fail-closed: a capability that is neither in the catalog nor in the
/// caller's own private namespace is denied as unknown regardless of
/// the granted list.
#[must_use]
pub fn check(plugin_id: &str, capability: &str, granted: &[String]) -> CapabilityCheck {
    if Capability::parse(capability).is_none() && !is_plugin_private(plugin_id, capability) {
        return CapabilityCheck::deny("Unknown capability");
    }
    if granted.iter().any(|g| g == capability) {
        CapabilityCheck::allow()
    } else {
        CapabilityCheck::deny(format!("'{capability}' was not granted at boot"))
    }
}

/// Checks a set of capabilities; the first denial wins.
#[must_use]
pub fn check_all(plugin_id: &str, capabilities: &[&str], granted: &[String]) -> CapabilityCheck {
    for capability in capabilities {
        let result = check(plugin_id, capability, granted);
        if !result.allowed {
            return result;
        }
    }
    CapabilityCheck::allow()
}

/// Decides which of a manifest's requested capabilities are granted.
///
/// Duplicate requests are decided once; every distinct requested
/// capability lands in exactly one of `granted` or `denied`.
#[must_use]
pub fn decide_grants(manifest: &PluginManifest) -> CapabilityGrantDecision {
    let mut decision = CapabilityGrantDecision::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for request in &manifest.requested_capabilities {
        let capability = request.capability.as_str();
        if !seen.insert(capability) {
            continue;
        }

        match Capability::parse(capability) {
            Some(known) => {
                let required = known.minimum_tier();
                if manifest.tier.allows(required) {
                    decision.granted.push(capability.to_string());
                } else {
                    decision.denied.push(capability.to_string());
                    decision.reasons.insert(
                        capability.to_string(),
                        format!(
                            "tier {} may not request '{capability}'; requires tier {required} or higher",
                            manifest.tier
                        ),
                    );
                }
            }
            None if is_plugin_private(&manifest.plugin_id, capability) => {
                if matches!(manifest.tier, Tier::B | Tier::MainApp) {
                    decision.granted.push(capability.to_string());
                } else {
                    decision.denied.push(capability.to_string());
                    decision.reasons.insert(
                        capability.to_string(),
                        format!(
                            "plugin-private capabilities require tier B or main-app, not tier {}",
                            manifest.tier
                        ),
                    );
                }
            }
            None => {
                decision.denied.push(capability.to_string());
                decision
                    .reasons
                    .insert(capability.to_string(), "Unknown capability".to_string());
            }
        }
    }
    decision
}

/// Structural validation of a manifest's capability requests.
///
/// Returns one message per problem; an empty vec means valid. Grant
/// denials are not errors — a manifest may legitimately request more
/// than its tier allows and run with the remainder.
#[must_use]
pub fn validate_manifest_capabilities(manifest: &PluginManifest) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for request in &manifest.requested_capabilities {
        let capability = request.capability.as_str();
        if capability.is_empty() {
            errors.push("requested capability has an empty identifier".to_string());
            continue;
        }
        if capability.chars().any(char::is_whitespace) {
            errors.push(format!("capability '{capability}' contains whitespace"));
        }
        if !seen.insert(capability) {
            errors.push(format!("capability '{capability}' requested more than once"));
        }
        if request.reason.trim().is_empty() {
            errors.push(format!("capability '{capability}' has no request reason"));
        }
    }
    errors
}

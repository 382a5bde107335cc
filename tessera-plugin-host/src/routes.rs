//! Route prefix safety and the per-plugin route table.
//!
//! Every plugin is assigned the base prefix `/api/v1/apps/<pluginId>`;
//! any prefix it mounts must stay under that base. The validator is a
//! pure string check — no I/O, no normalization — so a prefix that
//! needs decoding to look safe is simply rejected.

use crate::error::{BootPhase, PluginHostError};
use std::collections::HashMap;

/// Returns the base route prefix assigned to a plugin.
#[must_use]
pub fn plugin_base_prefix(plugin_id: &str) -> String {
    format!("/api/v1/apps/{plugin_id}")
}

/// Checks that a candidate route prefix cannot escape the plugin's
/// base prefix.
///
/// Valid only if the candidate is the base itself or the base followed
/// by `/`-separated segments, with no `.` or `..` segments, no doubled
/// separators, and no query string, fragment, backslash, or percent
/// escape. Prefixes are compared pre-decoding; percent escapes are
/// rejected outright.
#[must_use]
pub fn is_valid_plugin_route_prefix(base_prefix: &str, candidate: &str) -> bool {
    let Some(rest) = candidate.strip_prefix(base_prefix) else {
        return false;
    };
    if !rest.is_empty() && !rest.starts_with('/') {
        return false;
    }
    if candidate.contains('\\')
        || candidate.contains('?')
        || candidate.contains('#')
        || candidate.contains('%')
    {
        return false;
    }
    if candidate.contains("//") {
        return false;
    }
    if candidate.split('/').any(|segment| segment == "." || segment == "..") {
        return false;
    }
    true
}

/// Mounted route prefixes per plugin.
///
/// Written only by the boot orchestrator; read-only at request time.
#[derive(Debug, Default)]
pub struct RouteTable {
    by_plugin: HashMap<String, Vec<String>>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts a plugin's route prefixes, validating each against the
    /// plugin's base prefix. Nothing is mounted if any prefix fails.
    pub fn mount(
        &mut self,
        plugin_id: &str,
        prefixes: Vec<String>,
    ) -> Result<(), PluginHostError> {
        let base = plugin_base_prefix(plugin_id);
        for prefix in &prefixes {
            if !is_valid_plugin_route_prefix(&base, prefix) {
                return Err(PluginHostError::boot(
                    plugin_id,
                    BootPhase::Routes,
                    format!("route prefix '{prefix}' escapes the plugin namespace '{base}'"),
                ));
            }
        }
        self.by_plugin.insert(plugin_id.to_string(), prefixes);
        Ok(())
    }

    /// Returns a plugin's mounted prefixes.
    #[must_use]
    pub fn routes_for(&self, plugin_id: &str) -> &[String] {
        self.by_plugin
            .get(plugin_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_mounted(&self, plugin_id: &str) -> bool {
        self.by_plugin.contains_key(plugin_id)
    }

    /// Unmounts one plugin's routes (quarantine rollback).
    pub fn unmount(&mut self, plugin_id: &str) {
        self.by_plugin.remove(plugin_id);
    }
}

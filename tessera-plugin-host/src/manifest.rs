//! Plugin manifests, parsed from TOML at boot and read-only thereafter.

use crate::capabilities::Tier;
use crate::error::PluginHostError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// One capability request: the identifier plus the author's stated
/// reason, which is surfaced in admin tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedCapability {
    pub capability: String,
    pub reason: String,
}

/// A plugin's manifest. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginManifest {
    pub plugin_id: String,
    pub package_name: String,
    pub version: String,
    pub tier: Tier,
    #[serde(default)]
    pub requested_capabilities: Vec<RequestedCapability>,
    /// Feature id → default-enabled flag. The reserved feature id
    /// `enabled` (default true) controls whether the plugin activates
    /// at all.
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PluginManifest {
    /// Parses a manifest from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, PluginHostError> {
        toml::from_str(text).map_err(|e| PluginHostError::ManifestParse(e.to_string()))
    }

    /// Loads a manifest from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self, PluginHostError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PluginHostError::ManifestParse(format!("{}: {e}", path.display())))?;
        let manifest = Self::from_toml_str(&text)?;
        info!(plugin_id = %manifest.plugin_id, path = %path.display(), "loaded plugin manifest");
        Ok(manifest)
    }

    /// Whether the plugin should activate at all (the reserved
    /// `enabled` feature flag, default true).
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.features.get("enabled").copied().unwrap_or(true)
    }

    /// Structural validation.
    ///
    /// The plugin id is the root of the ability and private-capability
    /// namespaces, so it may not contain the grammar separators (`.`,
    /// `:`) or path characters.
    pub fn validate(&self) -> Result<(), PluginHostError> {
        let invalid = |message: String| PluginHostError::InvalidManifest {
            plugin_id: self.plugin_id.clone(),
            message,
        };

        if self.plugin_id.is_empty() {
            return Err(invalid("plugin id must not be empty".into()));
        }
        if !self
            .plugin_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid(format!(
                "plugin id '{}' may only contain ASCII alphanumerics, '-' and '_'",
                self.plugin_id
            )));
        }
        if self.package_name.is_empty() {
            return Err(invalid("package name must not be empty".into()));
        }

        let parts: Vec<&str> = self.version.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || p.parse::<u64>().is_err()) {
            return Err(invalid(format!(
                "version '{}' is not of the form MAJOR.MINOR.PATCH",
                self.version
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTES_MANIFEST: &str = r#"
plugin-id = "notes"
package-name = "@tessera/notes"
version = "1.4.0"
tier = "b"
dependencies = ["files"]

[[requested-capabilities]]
capability = "app:db:read"
reason = "read note rows"

[[requested-capabilities]]
capability = "app:db:write"
reason = "write note rows"

[features]
enabled = true
markdown-preview = false
"#;

    #[test]
    fn parse_full_manifest() {
        let m = PluginManifest::from_toml_str(NOTES_MANIFEST).unwrap();
        assert_eq!(m.plugin_id, "notes");
        assert_eq!(m.package_name, "@tessera/notes");
        assert_eq!(m.tier, Tier::B);
        assert_eq!(m.requested_capabilities.len(), 2);
        assert_eq!(m.requested_capabilities[0].capability, "app:db:read");
        assert_eq!(m.features.get("markdown-preview"), Some(&false));
        assert_eq!(m.dependencies, vec!["files"]);
        assert!(m.is_enabled());
        m.validate().unwrap();
    }

    // A top-level key written after the [features] header belongs to
    // that table, and feature values must be booleans.
    #[test]
    fn dependencies_under_features_table_rejected() {
        let result = PluginManifest::from_toml_str(
            r#"
plugin-id = "notes"
package-name = "@tessera/notes"
version = "1.0.0"
tier = "a"

[features]
enabled = true
dependencies = []
"#,
        );
        assert!(matches!(result, Err(PluginHostError::ManifestParse(_))));
    }

    #[test]
    fn minimal_manifest_defaults() {
        let m = PluginManifest::from_toml_str(
            r#"
plugin-id = "files"
package-name = "@tessera/files"
version = "0.1.0"
tier = "a"
"#,
        )
        .unwrap();
        assert!(m.requested_capabilities.is_empty());
        assert!(m.features.is_empty());
        assert!(m.dependencies.is_empty());
        assert!(m.is_enabled());
        m.validate().unwrap();
    }

    #[test]
    fn enabled_feature_flag_disables_plugin() {
        let m = PluginManifest::from_toml_str(
            r#"
plugin-id = "files"
package-name = "@tessera/files"
version = "0.1.0"
tier = "a"

[features]
enabled = false
"#,
        )
        .unwrap();
        assert!(!m.is_enabled());
    }

    #[test]
    fn parse_rejects_bad_tier() {
        let result = PluginManifest::from_toml_str(
            r#"
plugin-id = "files"
package-name = "@tessera/files"
version = "0.1.0"
tier = "d"
"#,
        );
        assert!(matches!(result, Err(PluginHostError::ManifestParse(_))));
    }

    #[test]
    fn validate_rejects_namespace_separators_in_id() {
        for bad in ["notes.app", "no:tes", "no/tes", "", "nötes"] {
            let m = PluginManifest {
                plugin_id: bad.into(),
                package_name: "pkg".into(),
                version: "1.0.0".into(),
                tier: Tier::A,
                requested_capabilities: Vec::new(),
                features: Default::default(),
                dependencies: Vec::new(),
            };
            assert!(m.validate().is_err(), "expected '{bad}' to be rejected");
        }
    }

    #[test]
    fn validate_rejects_non_semver_version() {
        for bad in ["1.0", "1.0.0.0", "v1.0.0", "1.0.x", ""] {
            let m = PluginManifest {
                plugin_id: "notes".into(),
                package_name: "pkg".into(),
                version: bad.into(),
                tier: Tier::A,
                requested_capabilities: Vec::new(),
                features: Default::default(),
                dependencies: Vec::new(),
            };
            assert!(m.validate().is_err(), "expected '{bad}' to be rejected");
        }
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.toml");
        std::fs::write(&path, NOTES_MANIFEST).unwrap();
        let m = PluginManifest::load_from(&path).unwrap();
        assert_eq!(m.plugin_id, "notes");
    }

    #[test]
    fn load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = PluginManifest::load_from(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(PluginHostError::ManifestParse(_))));
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Saved JMI conversion preferences shared by MBEE tools.

use mbee_jmi::{ElementTreeOptions, FieldPath, NonPackagePolicy, RootPolicy, TreeOptions};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Config key the preferences are stored under.
pub const JMI_PREFS_KEY: &str = "jmi";

/// Field names and policies applied when no command-line override is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JmiPrefs {
    /// Key, parent and type fields plus root/package policies.
    #[serde(flatten)]
    pub elements: ElementTreeOptions,
    /// Sibling sort field for element exports (input order when unset).
    pub sort_by: Option<FieldPath>,
}

impl JmiPrefs {
    /// Options for generic JMI conversions.
    pub fn tree_options(&self) -> TreeOptions {
        self.elements.tree.clone()
    }

    /// Options for element trees.
    pub fn element_options(&self) -> ElementTreeOptions {
        self.elements.clone()
    }

    /// Override the root policy.
    pub fn with_roots(mut self, roots: RootPolicy) -> Self {
        self.elements.tree.roots = roots;
        self
    }

    /// Override the non-package policy.
    pub fn with_non_package(mut self, policy: NonPackagePolicy) -> Self {
        self.elements.non_package = policy;
        self
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Load saved JMI preferences, or defaults when none are saved.
    pub fn load_jmi_prefs(&self) -> Result<JmiPrefs, ConfigError> {
        self.load_or_default(JMI_PREFS_KEY)
    }

    /// Persist JMI preferences.
    pub fn save_jmi_prefs(&self, prefs: &JmiPrefs) -> Result<(), ConfigError> {
        self.save(JMI_PREFS_KEY, prefs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;

    #[test]
    fn defaults_when_nothing_saved() {
        let service = ConfigService::new(MemoryConfigStore::default());
        let prefs = service.load_jmi_prefs().unwrap();
        assert_eq!(prefs, JmiPrefs::default());
        assert_eq!(prefs.tree_options().key_field.as_str(), "id");
        assert_eq!(prefs.element_options().type_field.as_str(), "type");
    }

    #[test]
    fn saved_prefs_round_trip_as_flat_json() {
        let service = ConfigService::new(MemoryConfigStore::default());
        let prefs = JmiPrefs {
            sort_by: Some(FieldPath::parse("name").unwrap()),
            ..JmiPrefs::default()
        }
        .with_roots(RootPolicy::FirstWins);
        service.save_jmi_prefs(&prefs).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&service.store().load_raw(JMI_PREFS_KEY).unwrap()).unwrap();
        assert_eq!(raw["roots"], "first_wins");
        assert_eq!(raw["key_field"], "id");
        assert_eq!(raw["sort_by"], "name");
        assert_eq!(service.load_jmi_prefs().unwrap(), prefs);
    }

    #[test]
    fn partial_prefs_fill_in_defaults() {
        let service = ConfigService::new(MemoryConfigStore::default());
        service
            .store()
            .save_raw(JMI_PREFS_KEY, br#"{"non_package": "drop"}"#)
            .unwrap();
        let prefs = service.load_jmi_prefs().unwrap();
        assert_eq!(prefs.elements.non_package, NonPackagePolicy::Drop);
        assert_eq!(prefs.tree_options(), TreeOptions::default());
    }
}

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// The toolchain of a project, inferred from its file names.
///
/// Every flag is the OR of substring matches over the whole path list, so a
/// `FeatureSet` is a pure function of its input. Label sets keep the order in
/// which labels were first seen and never hold duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub has_manifest_node: bool,
    pub has_manifest_python: bool,
    pub has_manifest_java: bool,
    pub has_container_file: bool,
    pub has_virtualenv_marker: bool,
    pub has_dependency_cache: bool,
    pub has_tests: bool,
    pub has_env_files: bool,
    pub has_build_artifacts: bool,
    pub has_database_hint: bool,
    pub has_api_hint: bool,
    #[serde(default)]
    pub frameworks: IndexSet<String>,
    #[serde(default)]
    pub databases: IndexSet<String>,
    #[serde(default)]
    pub testing_frameworks: IndexSet<String>,
    #[serde(default)]
    pub build_tools: IndexSet<String>,
}

impl FeatureSet {
    /// True when no flag is set and every label set is empty.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Short label for the dominant stack, used in logs and CLI output.
    pub fn primary_stack(&self) -> &'static str {
        if self.has_manifest_python {
            "python"
        } else if self.has_manifest_node {
            "node"
        } else if self.has_manifest_java {
            "java"
        } else {
            "unknown"
        }
    }
}

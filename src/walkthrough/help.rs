//! Static guidance text for onboarding steps.

use indexmap::IndexSet;

use crate::models::{FeatureSet, Step};

use super::catalog::StepKind;

/// Returned for any step title the catalog does not know.
pub const NO_GUIDE_AVAILABLE: &str =
    "No detailed guide is available for this step yet. Check the project README for instructions.";

fn guide(kind: StepKind) -> &'static str {
    match kind {
        StepKind::CloneRepository => {
            "Cloning downloads the complete project source code to your machine. The \
             repository contains the code, documentation and configuration files needed to \
             run the project, so every later step works against this local copy."
        }
        StepKind::NavigateToProject => {
            "Change your working directory to the project root so that every following command \
             runs from the right place. Most tooling resolves configuration files relative to \
             the current directory."
        }
        StepKind::InstallNodeDependencies => {
            "npm reads package.json and installs every listed package into node_modules. When a \
             lock file is present the exact recorded versions are installed, which keeps your \
             setup identical to the rest of the team."
        }
        StepKind::CreateVirtualEnvironment => {
            "A virtual environment is an isolated Python installation for this project. It \
             keeps the project's packages from clashing with other projects or with your \
             system Python."
        }
        StepKind::ActivateVirtualEnvironment => {
            "Activation points your shell at the virtual environment's interpreter and \
             packages. While it is active your prompt shows a '(venv)' prefix and 'pip' \
             installs into the environment."
        }
        StepKind::InstallPythonDependencies => {
            "pip installs the packages the project declares into the active virtual \
             environment. Run it again whenever the dependency file changes."
        }
        StepKind::InstallJavaDependencies => {
            "The build tool downloads the libraries declared in the project's build file into \
             a local cache. Later builds reuse that cache, so the first run is the slowest."
        }
        StepKind::ConfigureEnvironment => {
            "Environment variables hold settings such as database URLs and API keys that must \
             not be committed. Copy the example file and fill in values for your machine."
        }
        StepKind::SetUpDatabase => {
            "Migrations create the tables and schema the application expects. The database \
             server must be running and reachable with the settings from your environment \
             file before you apply them."
        }
        StepKind::RunTests => {
            "Running the test suite confirms the setup is complete. A failing test right after \
             setup usually means a dependency or configuration value is missing."
        }
        StepKind::StartDevServer => {
            "The development server runs the application locally, usually with automatic \
             reload on code changes. Keep it running in a separate terminal while you work."
        }
        StepKind::BuildProject => {
            "Building compiles and packages the project into deployable artifacts. It catches \
             errors the development server may tolerate and produces what CI will ship."
        }
        StepKind::ExploreStructure => {
            "Walk through the top-level directories to learn where the entry points, \
             configuration, and tests live. Knowing the layout makes the first change much \
             easier to find a home for."
        }
    }
}

/// Explain a step in plain language, annotated with the detected toolchain.
///
/// Pure and infallible: unknown titles degrade to [`NO_GUIDE_AVAILABLE`].
/// Label lines are appended in a fixed order and only for non-empty sets.
pub fn explain(step: &Step, features: &FeatureSet) -> String {
    let mut text = StepKind::from_title(&step.title)
        .map(guide)
        .unwrap_or(NO_GUIDE_AVAILABLE)
        .to_string();

    let annotations = [
        ("Detected frameworks", &features.frameworks),
        ("Detected databases", &features.databases),
        ("Testing frameworks", &features.testing_frameworks),
        ("Build tools", &features.build_tools),
    ];

    for (label, values) in annotations {
        if let Some(line) = annotation(label, values) {
            text.push('\n');
            text.push_str(&line);
        }
    }

    text
}

fn annotation(label: &str, values: &IndexSet<String>) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    Some(format!("{}: {}", label, joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walkthrough::plan;

    fn step_titled(title: &str) -> Step {
        Step {
            step_no: 1,
            title: title.to_string(),
            description: String::new(),
            prerequisites: vec![],
            related_files: vec![],
            command: None,
            success_criteria: String::new(),
            troubleshooting: String::new(),
        }
    }

    #[test]
    fn every_planned_step_has_a_guide() {
        let features = FeatureSet {
            has_manifest_node: true,
            has_manifest_python: true,
            has_manifest_java: true,
            has_env_files: true,
            has_database_hint: true,
            has_tests: true,
            has_build_artifacts: true,
            ..FeatureSet::default()
        };

        for step in plan(&features).steps() {
            assert_ne!(explain(step, &features), NO_GUIDE_AVAILABLE, "{}", step.title);
        }
    }

    #[test]
    fn unknown_title_falls_back() {
        let text = explain(&step_titled("Deploy to Production"), &FeatureSet::default());
        assert_eq!(text, NO_GUIDE_AVAILABLE);
    }

    #[test]
    fn no_annotations_without_labels() {
        let text = explain(&step_titled("Run Tests"), &FeatureSet::default());
        assert!(!text.contains("Detected"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn annotations_follow_fixed_order_and_skip_empty_sets() {
        let mut features = FeatureSet::default();
        features.build_tools.insert("Vite".to_string());
        features.frameworks.insert("React".to_string());
        features.frameworks.insert("Express".to_string());

        let text = explain(&step_titled("Build Project"), &features);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Detected frameworks: React, Express");
        assert_eq!(lines[2], "Build tools: Vite");
        assert!(!text.contains("Detected databases"));
        assert!(!text.contains("Testing frameworks"));
    }

    #[test]
    fn fallback_still_carries_annotations() {
        let mut features = FeatureSet::default();
        features.databases.insert("Redis".to_string());

        let text = explain(&step_titled("Something Custom"), &features);
        assert!(text.starts_with(NO_GUIDE_AVAILABLE));
        assert!(text.ends_with("Detected databases: Redis"));
    }
}

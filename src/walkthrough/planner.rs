//! Onboarding plan generation.
//!
//! A plan is built by walking [`RULES`] in order and emitting the step kinds
//! of every rule whose predicate holds. The rule order is the only ordering
//! there is: two gates that both fire always produce their steps in table
//! order.

use crate::models::{FeatureSet, Plan, Step};

use super::catalog::StepKind;

struct Rule {
    when: fn(&FeatureSet) -> bool,
    kinds: &'static [StepKind],
}

const RULES: &[Rule] = &[
    Rule {
        when: always,
        kinds: &[StepKind::CloneRepository, StepKind::NavigateToProject],
    },
    Rule {
        when: has_node,
        kinds: &[StepKind::InstallNodeDependencies],
    },
    Rule {
        when: has_python,
        kinds: &[
            StepKind::CreateVirtualEnvironment,
            StepKind::ActivateVirtualEnvironment,
            StepKind::InstallPythonDependencies,
        ],
    },
    Rule {
        when: has_java,
        kinds: &[StepKind::InstallJavaDependencies],
    },
    Rule {
        when: needs_configuration,
        kinds: &[StepKind::ConfigureEnvironment],
    },
    Rule {
        when: has_database,
        kinds: &[StepKind::SetUpDatabase],
    },
    Rule {
        when: has_tests,
        kinds: &[StepKind::RunTests],
    },
    Rule {
        when: always,
        kinds: &[StepKind::StartDevServer],
    },
    Rule {
        when: needs_build,
        kinds: &[StepKind::BuildProject],
    },
    Rule {
        when: always,
        kinds: &[StepKind::ExploreStructure],
    },
];

fn always(_: &FeatureSet) -> bool {
    true
}

fn has_node(f: &FeatureSet) -> bool {
    f.has_manifest_node
}

fn has_python(f: &FeatureSet) -> bool {
    f.has_manifest_python
}

fn has_java(f: &FeatureSet) -> bool {
    f.has_manifest_java
}

fn needs_configuration(f: &FeatureSet) -> bool {
    f.has_env_files || f.has_database_hint
}

fn has_database(f: &FeatureSet) -> bool {
    f.has_database_hint
}

fn has_tests(f: &FeatureSet) -> bool {
    f.has_tests
}

fn needs_build(f: &FeatureSet) -> bool {
    f.has_build_artifacts || !f.build_tools.is_empty()
}

/// The step kinds a feature set gates in, in emission order.
pub fn step_kinds(features: &FeatureSet) -> Vec<StepKind> {
    RULES
        .iter()
        .filter(|rule| (rule.when)(features))
        .flat_map(|rule| rule.kinds.iter().copied())
        .collect()
}

/// Generate the onboarding plan for a feature set.
///
/// Total and deterministic: the same feature set always yields the same plan,
/// and every plan contains at least the clone, navigate, start-server and
/// explore steps.
pub fn plan(features: &FeatureSet) -> Plan {
    let steps = step_kinds(features)
        .into_iter()
        .zip(1u32..)
        .map(|(kind, step_no)| build_step(kind, step_no, features))
        .collect();

    Plan::new(steps)
}

fn build_step(kind: StepKind, step_no: u32, features: &FeatureSet) -> Step {
    let template = kind.template();
    Step {
        step_no,
        title: template.title.to_string(),
        description: template.description.to_string(),
        prerequisites: template.prerequisites.iter().map(|s| s.to_string()).collect(),
        related_files: template.related_files.iter().map(|s| s.to_string()).collect(),
        command: command_for(kind, features).map(str::to_string),
        success_criteria: template.success_criteria.to_string(),
        troubleshooting: template.troubleshooting.to_string(),
    }
}

/// Suggested command for a step, picked from the detected toolchain.
fn command_for(kind: StepKind, f: &FeatureSet) -> Option<&'static str> {
    let framework = |name: &str| f.frameworks.contains(name);
    let build_tool = |name: &str| f.build_tools.contains(name);

    match kind {
        StepKind::CloneRepository => Some("git clone <repository_url>"),
        StepKind::NavigateToProject => Some("cd <project_directory>"),
        StepKind::InstallNodeDependencies => Some("npm install"),
        StepKind::CreateVirtualEnvironment => Some("python -m venv venv"),
        StepKind::ActivateVirtualEnvironment => Some("source venv/bin/activate"),
        StepKind::InstallPythonDependencies => Some("pip install -r requirements.txt"),
        StepKind::InstallJavaDependencies if build_tool("Gradle") => Some("gradle dependencies"),
        StepKind::InstallJavaDependencies => Some("mvn dependency:resolve"),
        StepKind::ConfigureEnvironment => Some("cp .env.example .env"),
        StepKind::SetUpDatabase if framework("Django") => Some("python manage.py migrate"),
        StepKind::SetUpDatabase if f.has_manifest_python => Some("alembic upgrade head"),
        StepKind::SetUpDatabase if f.has_manifest_node => Some("npm run migrate"),
        StepKind::SetUpDatabase => None,
        StepKind::RunTests if f.has_manifest_python => Some("pytest -v"),
        StepKind::RunTests if f.has_manifest_node => Some("npm test"),
        StepKind::RunTests if build_tool("Gradle") => Some("gradle test"),
        StepKind::RunTests if f.has_manifest_java => Some("mvn test"),
        StepKind::RunTests => None,
        StepKind::StartDevServer if framework("Django") => Some("python manage.py runserver"),
        StepKind::StartDevServer if framework("FastAPI") => Some("uvicorn main:app --reload"),
        StepKind::StartDevServer if framework("Flask") => Some("flask run"),
        StepKind::StartDevServer if f.has_manifest_python => Some("python main.py"),
        StepKind::StartDevServer if f.has_manifest_node => Some("npm run dev"),
        StepKind::StartDevServer if framework("Spring") => Some("mvn spring-boot:run"),
        StepKind::StartDevServer if f.has_container_file => Some("docker compose up"),
        StepKind::StartDevServer => None,
        StepKind::BuildProject if build_tool("Maven") => Some("mvn clean install"),
        StepKind::BuildProject if build_tool("Gradle") => Some("gradle build"),
        StepKind::BuildProject if f.has_manifest_node => Some("npm run build"),
        StepKind::BuildProject if build_tool("Make") => Some("make"),
        StepKind::BuildProject => None,
        StepKind::ExploreStructure => Some("tree -L 2"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walkthrough::extract;

    fn titles(plan: &Plan) -> Vec<&str> {
        plan.titles()
    }

    #[test]
    fn empty_features_yield_mandatory_steps_only() {
        let plan = plan(&FeatureSet::default());

        assert_eq!(
            titles(&plan),
            vec![
                "Clone Repository",
                "Navigate to Project Directory",
                "Start Development Server",
                "Explore Project Structure",
            ]
        );
    }

    #[test]
    fn python_with_tests_yields_eight_steps() {
        let features = extract(["requirements.txt", "app.py", "tests/test_app.py"]);
        let plan = plan(&features);

        assert_eq!(
            titles(&plan),
            vec![
                "Clone Repository",
                "Navigate to Project Directory",
                "Create Virtual Environment",
                "Activate Virtual Environment",
                "Install Python Dependencies",
                "Run Tests",
                "Start Development Server",
                "Explore Project Structure",
            ]
        );
        let numbers: Vec<u32> = plan.steps().iter().map(|s| s.step_no).collect();
        assert_eq!(numbers, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn every_gate_fires_in_fixed_order() {
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

        let kinds = step_kinds(&features);
        assert_eq!(kinds, StepKind::ALL.to_vec());
    }

    #[test]
    fn database_hint_alone_pulls_in_configuration() {
        let features = FeatureSet {
            has_database_hint: true,
            ..FeatureSet::default()
        };

        let kinds = step_kinds(&features);
        assert!(kinds.contains(&StepKind::ConfigureEnvironment));
        assert!(kinds.contains(&StepKind::SetUpDatabase));
    }

    #[test]
    fn build_tools_alone_add_build_step() {
        let mut features = FeatureSet::default();
        features.build_tools.insert("Make".to_string());

        let plan = plan(&features);
        let build = plan
            .steps()
            .iter()
            .find(|s| s.title == "Build Project")
            .expect("build step");
        assert_eq!(build.command.as_deref(), Some("make"));
    }

    #[test]
    fn prerequisites_never_reference_later_steps() {
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
        let plan = plan(&features);

        for step in plan.steps() {
            for prereq in &step.prerequisites {
                if let Some(target) = plan.steps().iter().find(|s| &s.title == prereq) {
                    assert!(
                        target.step_no < step.step_no,
                        "{} depends on later step {}",
                        step.title,
                        target.title
                    );
                }
            }
        }
    }

    #[test]
    fn commands_follow_detected_framework() {
        let features = extract(["manage.py", "requirements.txt", "app/models.py"]);
        let plan = plan(&features);

        let command = |title: &str| {
            plan.steps()
                .iter()
                .find(|s| s.title == title)
                .and_then(|s| s.command.clone())
        };
        assert_eq!(
            command("Set Up Database").as_deref(),
            Some("python manage.py migrate")
        );
        assert_eq!(
            command("Start Development Server").as_deref(),
            Some("python manage.py runserver")
        );
    }
}

//! Toolchain detection from a flat list of file paths.
//!
//! Detection is substring matching only: no file is opened and nothing is
//! inferred from directory structure. Where an ecosystem mixes case
//! conventions both spellings are listed explicitly.

use indexmap::IndexSet;

use crate::models::FeatureSet;

const NODE_MANIFESTS: &[&str] = &["package.json"];
const PYTHON_MANIFESTS: &[&str] = &["requirements.txt", "setup.py", "pyproject.toml", "Pipfile"];
const JAVA_MANIFESTS: &[&str] = &["pom.xml", "build.gradle"];
const CONTAINER_FILES: &[&str] = &["Dockerfile", "dockerfile", "docker-compose", "Containerfile"];
const VIRTUALENV_MARKERS: &[&str] = &["venv", "virtualenv"];
const DEPENDENCY_CACHES: &[&str] = &["node_modules", "__pycache__", "site-packages", ".gradle/", ".m2/"];
const TEST_MARKERS: &[&str] = &["test", "Test", ".spec."];
const ENV_FILES: &[&str] = &[".env"];
const BUILD_ARTIFACTS: &[&str] = &["dist/", "build/", "target/", ".jar"];
const DATABASE_HINTS: &[&str] = &[
    "models.py",
    "database",
    "Database",
    "db.py",
    "alembic",
    "migrations",
    "prisma",
    ".sql",
];
const API_HINTS: &[&str] = &["api/", "routes", "controllers", "openapi", "swagger", "graphql"];

type LabelRule = (&'static [&'static str], &'static str);

const FRAMEWORKS: &[LabelRule] = &[
    (&["manage.py", "django", "Django"], "Django"),
    (&["flask", "Flask"], "Flask"),
    (&["fastapi", "FastAPI"], "FastAPI"),
    (&["next.config"], "Next.js"),
    (&["angular.json"], "Angular"),
    (&["vue.config", ".vue"], "Vue"),
    (&["react", "React", ".jsx", ".tsx"], "React"),
    (&["svelte.config", ".svelte"], "Svelte"),
    (&["nest-cli.json"], "NestJS"),
    (&["express", "Express"], "Express"),
    (&["spring", "Spring"], "Spring"),
];

const DATABASES: &[LabelRule] = &[
    (&["postgres", "Postgres", "psycopg"], "PostgreSQL"),
    (&["mysql", "MySQL"], "MySQL"),
    (&["mongo", "Mongo"], "MongoDB"),
    (&["redis", "Redis"], "Redis"),
    (&["sqlite", "SQLite"], "SQLite"),
];

const TESTING_FRAMEWORKS: &[LabelRule] = &[
    (&["pytest", "conftest.py"], "pytest"),
    (&["tox.ini"], "tox"),
    (&["jest.config"], "Jest"),
    (&["vitest"], "Vitest"),
    (&["mocha", ".mocharc"], "Mocha"),
    (&["cypress"], "Cypress"),
    (&["playwright"], "Playwright"),
    (&["junit", "JUnit"], "JUnit"),
];

const BUILD_TOOLS: &[LabelRule] = &[
    (&["webpack.config"], "Webpack"),
    (&["vite.config"], "Vite"),
    (&["rollup.config"], "Rollup"),
    (&["Makefile", "makefile"], "Make"),
    (&["CMakeLists.txt"], "CMake"),
    (&["pom.xml"], "Maven"),
    (&["build.gradle", "gradlew"], "Gradle"),
];

/// Infer a [`FeatureSet`] from project file paths.
///
/// Never fails; an empty list yields an all-false feature set. Flags are a
/// monotonic OR across paths, so input order never changes the flags, and
/// label sets only record the first sighting of each label.
pub fn extract<I, S>(file_paths: I) -> FeatureSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut features = FeatureSet::default();

    for path in file_paths {
        let path = path.as_ref();

        features.has_manifest_node |= matches_any(path, NODE_MANIFESTS);
        features.has_manifest_python |= matches_any(path, PYTHON_MANIFESTS);
        features.has_manifest_java |= matches_any(path, JAVA_MANIFESTS);
        features.has_container_file |= matches_any(path, CONTAINER_FILES);
        features.has_virtualenv_marker |= matches_any(path, VIRTUALENV_MARKERS);
        features.has_dependency_cache |= matches_any(path, DEPENDENCY_CACHES);
        features.has_tests |= matches_any(path, TEST_MARKERS);
        features.has_env_files |= matches_any(path, ENV_FILES);
        features.has_build_artifacts |= matches_any(path, BUILD_ARTIFACTS);
        features.has_database_hint |= matches_any(path, DATABASE_HINTS);
        features.has_api_hint |= matches_any(path, API_HINTS);

        collect_labels(path, FRAMEWORKS, &mut features.frameworks);
        collect_labels(path, DATABASES, &mut features.databases);
        collect_labels(path, TESTING_FRAMEWORKS, &mut features.testing_frameworks);
        collect_labels(path, BUILD_TOOLS, &mut features.build_tools);
    }

    // A named database or test runner is as strong a signal as a generic hint.
    features.has_database_hint |= !features.databases.is_empty();
    features.has_tests |= !features.testing_frameworks.is_empty();

    tracing::debug!(
        stack = features.primary_stack(),
        frameworks = features.frameworks.len(),
        "extracted project features"
    );

    features
}

fn matches_any(path: &str, fragments: &[&str]) -> bool {
    fragments.iter().any(|fragment| path.contains(fragment))
}

fn collect_labels(path: &str, rules: &[LabelRule], labels: &mut IndexSet<String>) {
    for (fragments, label) in rules {
        if matches_any(path, fragments) && !labels.contains(*label) {
            labels.insert((*label).to_string());
        }
    }
}

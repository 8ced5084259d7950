//! Static metadata for every kind of onboarding step.
//!
//! Prerequisites and related files are fixed per step kind. A prerequisite
//! that names another step's title always names one the planner emits
//! earlier.

use serde::{Deserialize, Serialize};

/// Every step the planner can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    CloneRepository,
    NavigateToProject,
    InstallNodeDependencies,
    CreateVirtualEnvironment,
    ActivateVirtualEnvironment,
    InstallPythonDependencies,
    InstallJavaDependencies,
    ConfigureEnvironment,
    SetUpDatabase,
    RunTests,
    StartDevServer,
    BuildProject,
    ExploreStructure,
}

/// Fixed description of one step kind.
#[derive(Debug)]
pub struct StepTemplate {
    pub title: &'static str,
    pub description: &'static str,
    pub prerequisites: &'static [&'static str],
    pub related_files: &'static [&'static str],
    pub success_criteria: &'static str,
    pub troubleshooting: &'static str,
}

impl StepKind {
    pub const ALL: [StepKind; 13] = [
        Self::CloneRepository,
        Self::NavigateToProject,
        Self::InstallNodeDependencies,
        Self::CreateVirtualEnvironment,
        Self::ActivateVirtualEnvironment,
        Self::InstallPythonDependencies,
        Self::InstallJavaDependencies,
        Self::ConfigureEnvironment,
        Self::SetUpDatabase,
        Self::RunTests,
        Self::StartDevServer,
        Self::BuildProject,
        Self::ExploreStructure,
    ];

    pub fn title(self) -> &'static str {
        self.template().title
    }

    /// Reverse lookup from a step title. Exact match only.
    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.title() == title)
    }

    pub fn template(self) -> &'static StepTemplate {
        match self {
            Self::CloneRepository => &CLONE_REPOSITORY,
            Self::NavigateToProject => &NAVIGATE_TO_PROJECT,
            Self::InstallNodeDependencies => &INSTALL_NODE_DEPENDENCIES,
            Self::CreateVirtualEnvironment => &CREATE_VIRTUAL_ENVIRONMENT,
            Self::ActivateVirtualEnvironment => &ACTIVATE_VIRTUAL_ENVIRONMENT,
            Self::InstallPythonDependencies => &INSTALL_PYTHON_DEPENDENCIES,
            Self::InstallJavaDependencies => &INSTALL_JAVA_DEPENDENCIES,
            Self::ConfigureEnvironment => &CONFIGURE_ENVIRONMENT,
            Self::SetUpDatabase => &SET_UP_DATABASE,
            Self::RunTests => &RUN_TESTS,
            Self::StartDevServer => &START_DEV_SERVER,
            Self::BuildProject => &BUILD_PROJECT,
            Self::ExploreStructure => &EXPLORE_STRUCTURE,
        }
    }
}

static CLONE_REPOSITORY: StepTemplate = StepTemplate {
    title: "Clone Repository",
    description: "Get the project source code locally",
    prerequisites: &["Git installed", "Repository access"],
    related_files: &["README.md", ".gitignore"],
    success_criteria: "Project directory created with source files",
    troubleshooting: "If the clone fails, check the repository URL and your access permissions",
};

static NAVIGATE_TO_PROJECT: StepTemplate = StepTemplate {
    title: "Navigate to Project Directory",
    description: "Move into the project folder",
    prerequisites: &["Clone Repository"],
    related_files: &["*"],
    success_criteria: "Current directory is the project root",
    troubleshooting: "Use 'pwd' (Linux/macOS) or 'cd' (Windows) to check the current directory",
};

static INSTALL_NODE_DEPENDENCIES: StepTemplate = StepTemplate {
    title: "Install Node Dependencies",
    description: "Install all required Node.js packages",
    prerequisites: &["Node.js and npm installed", "Navigate to Project Directory"],
    related_files: &["package.json", "package-lock.json", "yarn.lock", "pnpm-lock.yaml"],
    success_criteria: "node_modules directory populated without errors",
    troubleshooting: "Delete node_modules and the lock file, then reinstall if versions conflict",
};

static CREATE_VIRTUAL_ENVIRONMENT: StepTemplate = StepTemplate {
    title: "Create Virtual Environment",
    description: "Create an isolated Python environment for dependencies",
    prerequisites: &["Python installed", "Navigate to Project Directory"],
    related_files: &["requirements.txt", "pyproject.toml", "Pipfile"],
    success_criteria: "venv directory created",
    troubleshooting: "If 'python' is not found, try 'python3' or install Python",
};

static ACTIVATE_VIRTUAL_ENVIRONMENT: StepTemplate = StepTemplate {
    title: "Activate Virtual Environment",
    description: "Activate the virtual environment to use project dependencies",
    prerequisites: &["Create Virtual Environment"],
    related_files: &["venv/"],
    success_criteria: "Prompt shows the '(venv)' prefix",
    troubleshooting: "On Windows run 'venv\\Scripts\\activate' instead",
};

static INSTALL_PYTHON_DEPENDENCIES: StepTemplate = StepTemplate {
    title: "Install Python Dependencies",
    description: "Install all required Python packages",
    prerequisites: &["Activate Virtual Environment"],
    related_files: &["requirements.txt", "setup.py", "pyproject.toml"],
    success_criteria: "All packages installed without errors",
    troubleshooting: "If installation fails, check your network connection and pinned package versions",
};

static INSTALL_JAVA_DEPENDENCIES: StepTemplate = StepTemplate {
    title: "Install Java Dependencies",
    description: "Resolve and download the project's Java libraries",
    prerequisites: &["JDK installed", "Navigate to Project Directory"],
    related_files: &["pom.xml", "build.gradle", "settings.gradle"],
    success_criteria: "Dependencies resolved into the local repository cache",
    troubleshooting: "Check JAVA_HOME and proxy settings if downloads fail",
};

static CONFIGURE_ENVIRONMENT: StepTemplate = StepTemplate {
    title: "Configure Environment Variables",
    description: "Set up required environment variables and configuration",
    prerequisites: &["Navigate to Project Directory"],
    related_files: &[".env.example", ".env", "config.*"],
    success_criteria: ".env file created and configured",
    troubleshooting: "Check .env.example for required variables and their documentation",
};

static SET_UP_DATABASE: StepTemplate = StepTemplate {
    title: "Set Up Database",
    description: "Initialize and configure the database",
    prerequisites: &["Configure Environment Variables", "Database server running"],
    related_files: &["alembic.ini", "migrations/", "models.*", "*.sql"],
    success_criteria: "Database schema created successfully",
    troubleshooting: "Make sure the database server is running and the connection settings are correct",
};

static RUN_TESTS: StepTemplate = StepTemplate {
    title: "Run Tests",
    description: "Execute the test suite to verify everything works",
    prerequisites: &["Project dependencies installed"],
    related_files: &["tests/", "test/", "pytest.ini", "conftest.py", "jest.config.*"],
    success_criteria: "All tests pass",
    troubleshooting: "Fix failing tests before proceeding; they usually point at a missed setup step",
};

static START_DEV_SERVER: StepTemplate = StepTemplate {
    title: "Start Development Server",
    description: "Launch the application locally",
    prerequisites: &["Navigate to Project Directory", "Environment configured"],
    related_files: &["main.*", "app.*", "server.*", "manage.py", "package.json"],
    success_criteria: "Server starts without errors",
    troubleshooting: "Check the server logs for errors and make sure the port is free",
};

static BUILD_PROJECT: StepTemplate = StepTemplate {
    title: "Build Project",
    description: "Compile and package the project",
    prerequisites: &["Navigate to Project Directory", "Project dependencies installed"],
    related_files: &["dist/", "build/", "target/", "Makefile", "pom.xml", "build.gradle"],
    success_criteria: "Build artifacts produced without errors",
    troubleshooting: "Clean previous build output and rebuild if artifacts are stale",
};

static EXPLORE_STRUCTURE: StepTemplate = StepTemplate {
    title: "Explore Project Structure",
    description: "Understand the codebase organization and key components",
    prerequisites: &["Clone Repository"],
    related_files: &["*"],
    success_criteria: "Familiar with the project layout",
    troubleshooting: "Use 'ls -la' (Linux/macOS) or 'dir' (Windows) to explore directories",
};

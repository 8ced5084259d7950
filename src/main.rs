use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aide_walkthrough::api::{self, AppState, SecurityConfig};
use aide_walkthrough::db::Database;
use aide_walkthrough::lister::{DefaultLister, FileLister};
use aide_walkthrough::models::{ProjectKey, DEFAULT_USER};
use aide_walkthrough::walkthrough::{self, SessionTracker};

#[derive(Parser)]
#[command(name = "aide")]
#[command(about = "Guided onboarding walkthroughs for unfamiliar repositories")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the walkthrough HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Print the detected features and setup plan for a project
    Plan {
        /// Local path or GitHub URL
        path: String,
    },
    /// Show walkthrough progress for a project
    Status {
        path: String,
        #[arg(short, long, default_value = DEFAULT_USER)]
        user: String,
    },
    /// Discard walkthrough progress for a project
    Reset {
        path: String,
        #[arg(short, long, default_value = DEFAULT_USER)]
        user: String,
    },
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "aide_walkthrough=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database() -> anyhow::Result<Database> {
    let db = Database::open_default()?;
    db.migrate()?;
    Ok(db)
}

async fn serve(port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting walkthrough server on port {}", port);

    let app = api::create_router_with_config(
        AppState::new(open_database()?),
        SecurityConfig::from_env(),
    );

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Walkthrough server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await?,
        Some(Commands::Plan { path }) => {
            let files = DefaultLister::from_env().list_project_files(&path).await?;
            let features = walkthrough::extract(&files);
            let plan = walkthrough::plan(&features);
            let output = serde_json::json!({
                "features": features,
                "steps": plan,
                "total_steps": plan.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Some(Commands::Status { path, user }) => {
            let tracker = SessionTracker::new(Arc::new(open_database()?));
            let progress = tracker.get_status(&ProjectKey::new(&path, &user))?;
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        Some(Commands::Reset { path, user }) => {
            let tracker = SessionTracker::new(Arc::new(open_database()?));
            let key = ProjectKey::new(&path, &user);
            tracker.reset(&key)?;
            println!("Walkthrough progress reset for {}", key);
        }
        None => serve(3000).await?,
    }

    Ok(())
}

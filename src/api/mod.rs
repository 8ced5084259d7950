mod handlers;
mod middleware;
mod types;

pub use middleware::{RateLimiter, SecurityConfig};
pub use types::*;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::Database;
use crate::gateway::{AnswerEngine, DryRunGateway, ExecutionGateway};
use crate::lister::{DefaultLister, FileLister};
use crate::walkthrough::SessionTracker;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub tracker: SessionTracker,
    pub lister: Arc<dyn FileLister>,
    pub gateway: Arc<dyn ExecutionGateway>,
    pub answers: Option<Arc<dyn AnswerEngine>>,
}

impl AppState {
    /// Database-backed tracker, environment-configured file listing and
    /// dry-run execution.
    pub fn new(db: Database) -> Self {
        Self {
            tracker: SessionTracker::new(Arc::new(db)),
            lister: Arc::new(DefaultLister::from_env()),
            gateway: Arc::new(DryRunGateway::default()),
            answers: None,
        }
    }

    pub fn with_lister(mut self, lister: impl FileLister + 'static) -> Self {
        self.lister = Arc::new(lister);
        self
    }

    pub fn with_gateway(mut self, gateway: impl ExecutionGateway + 'static) -> Self {
        self.gateway = Arc::new(gateway);
        self
    }

    pub fn with_answer_engine(mut self, engine: impl AnswerEngine + 'static) -> Self {
        self.answers = Some(Arc::new(engine));
        self
    }
}

/// Router with security disabled, for local use and tests.
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, SecurityConfig::disabled())
}

pub fn create_router_with_config(state: AppState, config: SecurityConfig) -> Router {
    let mut walkthrough = Router::new()
        .route("/plan", post(handlers::plan_files))
        .route("/start", post(handlers::start_walkthrough))
        .route("/steps", post(handlers::get_steps))
        .route("/session-status", post(handlers::session_status))
        .route("/complete-step", post(handlers::complete_step))
        .route("/execute-step", post(handlers::execute_step))
        .route("/help", post(handlers::get_help))
        .route("/resume", post(handlers::resume))
        .route("/reset", post(handlers::reset))
        .route("/executions", post(handlers::list_executions))
        .layer(from_fn_with_state(config.clone(), middleware::auth_middleware));

    // Outermost, so rejected credentials still count against the limit.
    if let Some(limiter) = config.rate_limiter.clone() {
        walkthrough = walkthrough.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    let api = Router::new()
        .route("/health", get(handlers::health))
        .nest("/walkthrough", walkthrough);

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config)),
        )
        .with_state(state)
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", o);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}

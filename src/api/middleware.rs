//! API key authentication and per-client rate limiting for the walkthrough
//! routes.
//!
//! Both layers wrap `/api/v1/walkthrough/*` only; `/health` answers without
//! credentials. Settings come from the environment:
//! - `AIDE_API_KEY` - bearer token; also switches on rate limiting
//! - `AIDE_RATE_LIMIT` - requests per client per minute (default: 100)
//! - `AIDE_CORS_ORIGINS` - comma-separated allowed origins (default: any)

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

const DEFAULT_RATE_LIMIT: u32 = 100;
const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Security settings for the HTTP server.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Bearer token required on walkthrough routes (`AIDE_API_KEY`)
    pub api_key: Option<String>,
    /// Allowed CORS origins (`AIDE_CORS_ORIGINS`, comma-separated)
    pub cors_origins: Option<Vec<String>>,
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    /// Load from the environment. Rate limiting (`AIDE_RATE_LIMIT` requests
    /// per minute) is only switched on when an API key is set.
    pub fn from_env() -> Self {
        let api_key = std::env::var("AIDE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let cors_origins = std::env::var("AIDE_CORS_ORIGINS").ok().map(|s| {
            s.split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        });

        let rate_limit = std::env::var("AIDE_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT);

        let rate_limiter = api_key
            .as_ref()
            .map(|_| RateLimiter::new(rate_limit, RATE_WINDOW));

        Self {
            api_key,
            cors_origins,
            rate_limiter,
        }
    }

    /// No authentication, permissive CORS, no rate limiting.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn with_rate_limit(mut self, max_requests: u32) -> Self {
        self.rate_limiter = Some(RateLimiter::new(max_requests, RATE_WINDOW));
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }
}

/// Sliding-window request counter keyed by client IP.
///
/// Clients whose window has emptied are dropped on a periodic sweep, so the
/// table only holds addresses seen within the last window.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    state: Arc<Mutex<LimiterState>>,
}

#[derive(Debug)]
struct LimiterState {
    clients: HashMap<IpAddr, Vec<Instant>>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(LimiterState {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Record a request from `ip`. Returns false once the window is full.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let window = self.window;
        let live = |t: &Instant| now.duration_since(*t) < window;

        let mut state = self.state.lock().expect("rate limiter lock poisoned");
        if now.duration_since(state.last_sweep) >= window {
            state.clients.retain(|_, hits| {
                hits.retain(live);
                !hits.is_empty()
            });
            state.last_sweep = now;
        }

        let hits = state.clients.entry(ip).or_default();
        hits.retain(live);

        if hits.len() < self.max_requests as usize {
            hits.push(now);
            true
        } else {
            false
        }
    }

    /// Number of client addresses currently held.
    pub fn tracked_clients(&self) -> usize {
        self.state
            .lock()
            .expect("rate limiter lock poisoned")
            .clients
            .len()
    }
}

/// Rejects walkthrough requests without `Authorization: Bearer <AIDE_API_KEY>`.
///
/// Every walkthrough route reads or writes a user's progress by project path
/// alone, so a server reachable beyond localhost must set a key. With no key
/// configured all requests pass.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = &config.api_key else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) if token == expected => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Invalid API key provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Missing or malformed Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Caps walkthrough requests per client IP. Layered outside the auth check
/// so failed key guesses are counted too.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = client_ip(&request);

    if rate_limiter.check(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Rate limit exceeded for IP: {}", ip);
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Client address from proxy headers, falling back to localhost.
fn client_ip(request: &Request<Body>) -> IpAddr {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    header("X-Forwarded-For")
        .and_then(|v| v.split(',').next().and_then(|ip| ip.trim().parse().ok()))
        .or_else(|| header("X-Real-IP").and_then(|v| v.trim().parse().ok()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

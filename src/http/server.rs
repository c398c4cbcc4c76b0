//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared security state from config
//! - Create the Axum Router with handlers and the security kernel
//! - Wire up middleware (request id, tracing, timeout)
//! - Run background sweepers for the nonce store and rate limiter
//! - Apply actor roster reloads
//! - Serve until shutdown

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{GatewayConfig, RouteConfig};
use crate::http::{handlers, kernel, request, response};
use crate::routing::RouteRequirementsMap;
use crate::security::nonce::{InMemoryNonceStore, NonceFormat};
use crate::security::rate_limit::RateLimiter;
use crate::security::registry::ActorRegistry;
use crate::security::{Actor, SecurityPipeline};

/// Application state shared by the kernel and handlers.
pub struct AppState {
    pub routes: RouteRequirementsMap,
    pub pipeline: SecurityPipeline,
    pub registry: Arc<ActorRegistry>,
    pub nonces: Arc<InMemoryNonceStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub max_body_size: usize,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let security = &config.security;
        let registry = Arc::new(ActorRegistry::from_config(&config.actors));
        let nonces = Arc::new(InMemoryNonceStore::new(Duration::from_secs(security.nonce_ttl_secs)));
        let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(security.rate_limit_window_secs)));

        let pipeline = SecurityPipeline::new(
            registry.clone(),
            nonces.clone(),
            NonceFormat::new(security.nonce_min_len, security.nonce_max_len),
            rate_limiter.clone(),
        );

        Self {
            routes: RouteRequirementsMap::from_config(&config.routes),
            pipeline,
            registry,
            nonces,
            rate_limiter,
            max_body_size: security.max_body_size,
        }
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    state: SharedState,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a new server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let state = Arc::new(AppState::from_config(&config));
        tracing::info!(
            routes = state.routes.len(),
            actors = state.registry.len(),
            "Security state initialized"
        );
        Self { state, config }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/readiness", get(handlers::readiness))
            .route("/version", get(handlers::version))
            .route("/security/echo", post(handlers::echo))
            .route("/security/encrypted-echo", post(handlers::echo))
            .route("/security/admin-echo", post(handlers::echo))
            .route("/security/missing-requirements", post(handlers::echo))
            .route_layer(middleware::from_fn_with_state(self.state.clone(), kernel::security_kernel))
            .fallback(response::not_found)
            .with_state(self.state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::from_fn(request::request_id_middleware))
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(self.config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweep_every = Duration::from_secs(self.config.security.sweep_interval_secs);
        let sweeper = tokio::spawn(run_sweeper(self.state.clone(), sweep_every, shutdown.resubscribe()));

        let state = self.state.clone();
        let current_routes = self.config.routes.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        let reloader = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = reload_shutdown.recv() => break,
                    update = config_updates.recv() => {
                        let Some(config) = update else { break };
                        apply_reload(&state, &current_routes, config);
                    }
                }
            }
        });

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        sweeper.abort();
        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn apply_reload(state: &AppState, current_routes: &[RouteConfig], config: GatewayConfig) {
    let unchanged = current_routes.len() == config.routes.len()
        && current_routes
            .iter()
            .zip(&config.routes)
            .all(|(a, b)| a.key() == b.key() && a.requirements == b.requirements);
    if !unchanged {
        tracing::warn!("Route requirements changed on disk; restart to apply them");
    }
    state.registry.replace(config.actors.iter().map(Actor::from));
}

/// Periodically drop expired nonces and idle rate-limit windows.
async fn run_sweeper(state: SharedState, every: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = interval.tick() => {
                let now = Instant::now();
                let nonces = state.nonces.purge_expired(now);
                let windows = state.rate_limiter.purge_idle(now);
                tracing::debug!(nonces, windows, "Sweep complete");
            }
        }
    }
}

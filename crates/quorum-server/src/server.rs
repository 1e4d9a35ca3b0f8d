use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware, routing::get};
use quorum_auth::config::RevocationBackend;
use quorum_auth::storage::{
    InMemoryTokenBlacklist, InMemoryUserStorage, RedisTokenBlacklist, TokenBlacklist, UserStorage,
};
use quorum_auth::token::{JwtError, JwtService};
use quorum_auth::{AuthError, SessionState, auth_routes};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    bootstrap,
    config::AppConfig,
    handlers,
    middleware::{self as app_middleware, RequestId},
};

/// Errors raised while assembling the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("token service: {0}")]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionState,
}

impl AppState {
    pub fn new(session: SessionState) -> Self {
        Self { session }
    }
}

pub struct QuorumServer {
    addr: SocketAddr,
    app: Router,
    state: AppState,
    purge_interval: Duration,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest("/auth", auth_routes(state.session.clone()))
        .with_state(state)
        // Outermost first: request id -> trace -> cors -> compression -> body limit
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                            use tracing::field::Empty;
                            let req_id = req
                                .extensions()
                                .get::<RequestId>()
                                .map(|id| id.as_str().to_string())
                                .unwrap_or_default();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new())
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
}

/// Builds the revocation store selected by `[revocation]`.
pub async fn build_blacklist(cfg: &AppConfig) -> Result<Arc<dyn TokenBlacklist>, ServerError> {
    match cfg.revocation.backend {
        RevocationBackend::Memory => {
            tracing::info!("Using in-memory revocation list");
            Ok(Arc::new(InMemoryTokenBlacklist::new()))
        }
        RevocationBackend::Redis => {
            let url = cfg.revocation.redis_url.as_deref().ok_or_else(|| {
                ServerError::Config("revocation.redis_url is required for redis backend".into())
            })?;
            let blacklist = RedisTokenBlacklist::connect(url).await?;
            tracing::info!("Connected to redis revocation list");
            Ok(Arc::new(blacklist))
        }
    }
}

/// Periodically drops revocation records whose token has expired anyway.
pub fn spawn_purge_task(blacklist: Arc<dyn TokenBlacklist>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match blacklist.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired revocation records"),
                Err(e) => tracing::warn!(error = %e, "Revocation purge failed"),
            }
        }
    })
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    users: Option<Arc<dyn UserStorage>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            users: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Uses the given user store instead of a fresh in-memory one.
    pub fn with_user_storage(mut self, users: Arc<dyn UserStorage>) -> Self {
        self.users = Some(users);
        self
    }

    pub async fn build(self) -> Result<QuorumServer, ServerError> {
        self.config.validate().map_err(ServerError::Config)?;

        let jwt_service = Arc::new(JwtService::from_config(&self.config.auth)?);
        let blacklist = build_blacklist(&self.config).await?;
        let users = self
            .users
            .unwrap_or_else(|| Arc::new(InMemoryUserStorage::new()) as Arc<dyn UserStorage>);

        bootstrap::seed_admin_user(users.as_ref(), &self.config.bootstrap).await?;

        let state = AppState::new(SessionState::new(jwt_service, blacklist, users));
        let app = build_app(&self.config, state.clone());

        Ok(QuorumServer {
            addr: self.addr,
            app,
            state,
            purge_interval: self.config.auth.purge_interval,
        })
    }
}

impl QuorumServer {
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let purge = spawn_purge_task(self.state.session.blacklist.clone(), self.purge_interval);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        purge.abort();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

//! Sentiment Query API Server
//!
//! HTTP front end that classifies submitted text and records every
//! successful classification in the query log.

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use data_validator::QueryValidator;
use inference_engine::{build_classifier, InferencePool, SentimentClassifier};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use storage::Repository;
use tokio::net::TcpListener;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod dashboard;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod settings;

pub use error::ApiError;
pub use rate_limit::RateLimitConfig;
pub use settings::{LoggingConfig, ServerConfig, Settings};

/// Application state shared across handlers
pub struct AppState {
    /// Query log repository
    pub repository: Repository,
    /// Classifier dispatch
    pub inference: InferencePool,
    /// Input validation
    pub validator: QueryValidator,
    /// Prometheus handle, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(repository: Repository, inference: InferencePool, validator: QueryValidator) -> Self {
        Self {
            repository,
            inference,
            validator,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Attach a Prometheus handle for `GET /metrics`
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, rate_limit: &RateLimitConfig) -> Router {
    let mut query = Router::new().route("/query", post(routes::query::post_query));

    if rate_limit.enabled {
        match rate_limit::create_governor_config(rate_limit) {
            Some(config) => query = query.layer(GovernorLayer { config }),
            None => warn!("Rate limiting disabled: quota must be non-zero"),
        }
    }

    Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .merge(query)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

/// Build shared state: database, schema, classifier, validator
pub async fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let repository = Repository::connect(&settings.database)
        .await
        .context("connecting to database")?;
    repository
        .init_schema()
        .await
        .context("creating query_logs schema")?;

    let inference_config = settings.inference.clone();
    let classifier: Arc<dyn SentimentClassifier> =
        tokio::task::spawn_blocking(move || build_classifier(&inference_config))
            .await
            .context("model loader panicked")?
            .context("loading sentiment model")?;

    let inference = InferencePool::new(classifier, settings.inference.concurrency());
    let validator = QueryValidator::new(settings.validation.clone());

    Ok(AppState::new(repository, inference, validator))
}

/// Serve `app` on `listener` until Ctrl-C or SIGTERM
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

/// Run the server
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder not installed: {}", e);
            None
        }
    };

    let state = Arc::new(build_state(&settings).await?.with_metrics(metrics));
    let repository = state.repository.clone();
    let app = create_router(state, &settings.rate_limit);

    let addr = settings.server.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Starting API server on {}", addr);

    serve(listener, app).await.context("serving HTTP")?;

    info!("API server shutting down");
    repository.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

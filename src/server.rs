use crate::config::Config;
use crate::error::Result;
use crate::handlers::{index, languages, no, AppState};
use crate::key_extractor::ClientKeyExtractor;
use crate::middleware::{logging_middleware, rate_limit_middleware, RequestGate};
use crate::reasons::ReasonStore;
use crate::registry::LimiterRegistry;
use crate::response::{EndpointSummary, PreSerialized};
use axum::routing::get;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Routes listed by the `/` index.
const INDEXED_ROUTES: &[(&str, &[&str])] = &[("/langs", &["GET"]), ("/no", &["GET"])];

/// Build the router. Every route sits behind `gate`.
pub fn create_app(reasons: ReasonStore, gate: Arc<RequestGate>) -> Result<Router> {
    let endpoints = INDEXED_ROUTES
        .iter()
        .map(|(route, methods)| EndpointSummary::new(route, methods))
        .collect::<Vec<_>>();
    let cached = PreSerialized::new(&endpoints, reasons.available_languages())?;
    let state = Arc::new(AppState { reasons, cached });

    let app = Router::new()
        .route("/", get(index))
        .route("/langs", get(languages))
        .route("/no", get(no))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&gate),
            rate_limit_middleware,
        ))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn_with_state(gate, logging_middleware)),
        );

    Ok(app)
}

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
    gate: Arc<RequestGate>,
    sweep_interval: Option<Duration>,
}

impl Server {
    /// Load reasons and wire the limiter. Fails on invalid limits or a
    /// missing default language.
    pub fn new(config: Config) -> Result<Self> {
        config.check()?;
        let policy = config.rate_limit_policy()?;
        let reasons = ReasonStore::load(&config.reasons_dir)?;

        let gate = Arc::new(RequestGate::new(
            ClientKeyExtractor::new(config.trusted_header.clone()),
            Arc::new(LimiterRegistry::new()),
            policy,
        ));
        let app = create_app(reasons, Arc::clone(&gate))?;

        Ok(Self {
            app,
            bind_addr: config.bind_addr,
            gate,
            sweep_interval: config.sweep_interval,
        })
    }

    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("NaaS server listening on {}", self.bind_addr);
        tracing::info!(
            policy = %self.gate.policy(),
            "Rate limiting enabled per client"
        );

        if let Some(interval) = self.sweep_interval {
            tokio::spawn(sweep_task(Arc::clone(&self.gate), interval));
        }

        // Connect info exposes the remote address to the key extractor.
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("NaaS server stopped");
        Ok(())
    }
}

/// Periodically drop limiter entries whose window has expired.
async fn sweep_task(gate: Arc<RequestGate>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let now = gate.clock().now();
        let removed = gate.registry().sweep_expired(now, gate.policy().window());
        tracing::debug!(
            removed,
            tracked = gate.registry().len(),
            "Limiter sweep finished"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

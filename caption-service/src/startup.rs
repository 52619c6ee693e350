//! Application startup and lifecycle management.
//!
//! Two listeners: the public caption API on `APP__PORT`, and health, readiness
//! and metrics on `OPS_PORT`.

use crate::config::CaptionConfig;
use crate::handlers::{
    generate::generate_caption,
    health::{health_check, metrics_endpoint, readiness_check},
    routes::{fallback, method_not_allowed, preflight, GENERATE_PATH},
};
use crate::services::providers::{openai::OpenAiProvider, CaptionProvider};
use crate::services::CaptionInvoker;
use axum::{middleware::from_fn, routing::get, routing::post, Router};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub invoker: CaptionInvoker,
}

impl AppState {
    pub fn new(provider: Arc<dyn CaptionProvider>, model: impl Into<String>) -> Self {
        Self {
            invoker: CaptionInvoker::new(provider, model),
        }
    }
}

/// Public router. Only `/api/generate` is routed; everything else goes
/// through [`fallback`].
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            GENERATE_PATH,
            post(generate_caption)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(fallback)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Operational router for health checks and Prometheus scraping.
pub fn build_ops_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    ops_port: u16,
    listener: TcpListener,
    ops_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the OpenAI provider from `config`.
    pub async fn build(config: CaptionConfig) -> Result<Self, AppError> {
        let provider = OpenAiProvider::new(config.openai.clone()).map_err(|e| {
            tracing::error!("Failed to initialize completion provider: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e))
        })?;

        tracing::info!(
            model = %config.openai.model,
            base_url = %config.openai.base_url,
            "Initialized chat completions provider"
        );

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around an existing provider.
    pub async fn build_with_provider(
        config: CaptionConfig,
        provider: Arc<dyn CaptionProvider>,
    ) -> Result<Self, AppError> {
        let state = AppState::new(provider, config.openai.model.clone());

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            e
        })?;
        let port = listener.local_addr()?.port();

        let ops_addr = SocketAddr::from(([0, 0, 0, 0], config.ops.port));
        let ops_listener = TcpListener::bind(ops_addr).await.map_err(|e| {
            tracing::error!("Failed to bind ops listener to {}: {}", ops_addr, e);
            e
        })?;
        let ops_port = ops_listener.local_addr()?.port();

        Ok(Self {
            port,
            ops_port,
            listener,
            ops_listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn ops_port(&self) -> u16 {
        self.ops_port
    }

    /// Serve both listeners until a shutdown signal arrives or either fails.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        let router = build_router(self.state);
        let ops_router = build_ops_router();

        tracing::info!("Caption API listening on port {}", self.port);
        tracing::info!("Ops endpoints listening on port {}", self.ops_port);

        let api = axum::serve(self.listener, router).with_graceful_shutdown(shutdown_signal());
        let ops =
            axum::serve(self.ops_listener, ops_router).with_graceful_shutdown(shutdown_signal());

        tokio::select! {
            result = api => {
                if let Err(e) = result {
                    tracing::error!("HTTP server error: {}", e);
                    return Err(std::io::Error::other(format!("HTTP server error: {}", e)));
                }
            }
            result = ops => {
                if let Err(e) = result {
                    tracing::error!("Ops server error: {}", e);
                    return Err(std::io::Error::other(format!("Ops server error: {}", e)));
                }
            }
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}

//! HTTP service: metadata, analysis and proxy endpoints.

mod error;
mod handlers;

pub use error::ApiError;

use crate::analysis::{AnalysisDriver, SharedCoreFactory};
use crate::config::MprobeConfig;
use crate::events::{self, EventSink};
use crate::target::TargetPolicy;
use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: MprobeConfig,
    policy: TargetPolicy,
    factory: SharedCoreFactory,
    events: Option<EventSink>,
}

impl AppState {
    pub fn new(config: MprobeConfig, factory: SharedCoreFactory, events: Option<EventSink>) -> Self {
        let policy = TargetPolicy {
            allow_private: config.allow_private_targets,
        };
        Self {
            inner: Arc::new(Inner {
                config,
                policy,
                factory,
                events,
            }),
        }
    }

    pub fn config(&self) -> &MprobeConfig {
        &self.inner.config
    }

    pub fn policy(&self) -> &TargetPolicy {
        &self.inner.policy
    }

    /// A driver for one request. Clients never share a core, so concurrent
    /// analyses from different clients do not contend.
    pub fn new_driver(&self) -> AnalysisDriver {
        let driver = AnalysisDriver::new(
            Arc::clone(&self.inner.factory),
            self.inner.config.analysis.max_requests,
        );
        match self.events() {
            Some(sink) => driver.with_events(sink),
            None => driver,
        }
    }

    fn events(&self) -> Option<EventSink> {
        self.inner.events.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/info", get(handlers::info))
        .route("/resource/analyze", get(handlers::analyze))
        .route(
            "/p/{target}/{filename}",
            get(handlers::proxy_get)
                .head(handlers::proxy_head)
                .options(handlers::proxy_options),
        )
        .with_state(state)
}

/// Serves on `listener` until `shutdown` resolves. Events are drained into tracing.
pub async fn serve(
    listener: TcpListener,
    config: MprobeConfig,
    factory: SharedCoreFactory,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let logger = tokio::spawn(events::log_events(rx));
    let state = AppState::new(config, factory, Some(tx));
    let addr = listener.local_addr().context("listener has no address")?;
    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;
    // Router and state are gone, so the event sender is closed.
    let _ = logger.await;
    tracing::info!("server stopped");
    Ok(())
}

/// Binds `config.bind` and serves until `shutdown` resolves.
pub async fn bind_and_serve(
    config: MprobeConfig,
    factory: SharedCoreFactory,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    serve(listener, config, factory, shutdown).await
}

//! HTTP surface shared by both startup modes.

pub mod handlers;
pub mod pages;

use crate::adapters::build_renderer;
use crate::config::{RunMode, Settings};
use crate::core::cache::FeedCache;
use crate::core::engine::FeedEngine;
use crate::core::pipeline::ScrapePipeline;
use crate::domain::ports::PageRenderer;
use crate::supervisor::AppFactory;
use crate::utils::error::{Result, ScrapeError};
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Per-worker application state. The cache is handed in so it can outlive the worker.
pub struct AppState {
    pub engine: FeedEngine<ScrapePipeline>,
    pub mode: RunMode,
}

impl AppState {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        cache: Arc<FeedCache>,
        max_items: usize,
        mode: RunMode,
    ) -> Self {
        Self {
            engine: FeedEngine::new(ScrapePipeline::new(renderer, max_items), cache),
            mode,
        }
    }

    pub fn from_settings(settings: &Settings, cache: Arc<FeedCache>) -> Result<Self> {
        let renderer = build_renderer(&settings.scrape)?;
        Ok(Self::new(
            renderer,
            cache,
            settings.scrape.max_items,
            settings.server.mode,
        ))
    }

    pub fn renderer(&self) -> &Arc<dyn PageRenderer> {
        self.engine.pipeline().renderer()
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/feed", get(handlers::create_feed))
        .route("/debug", get(handlers::debug_page))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router builder for managed workers. Each call creates its own renderer; the cache is shared.
pub fn router_factory(settings: Settings, cache: Arc<FeedCache>) -> AppFactory {
    Arc::new(move || {
        let state = AppState::from_settings(&settings, cache.clone())?;
        Ok(create_router(Arc::new(state)))
    })
}

/// Serve without supervision: no recycling, no request timeout, one runtime.
pub async fn serve_bare<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("🚀 Serving on http://{} (bare mode)", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ScrapeError::ServerError {
            message: e.to_string(),
        })?;

    tracing::info!("Server on {} stopped", addr);
    Ok(())
}

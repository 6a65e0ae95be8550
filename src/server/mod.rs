//! HTTP server
//!
//! Wires the search façade and the query service behind an axum router.

pub mod api;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::maps::MapsService;
use crate::query::GeoQueryService;

pub use api::{create_router, ApiResponse, HealthResponse};

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Search and ingestion
    pub maps: Arc<MapsService>,

    /// Geographic reads
    pub pois: Arc<GeoQueryService>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(maps: MapsService, pois: GeoQueryService) -> Self {
        Self {
            maps: Arc::new(maps),
            pois: Arc::new(pois),
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

pub struct PoiServer {
    config: ServerConfig,
    state: AppState,
}

impl PoiServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve until `shutdown_signal` completes
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!(%addr, "Starting POI server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("POI server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

#[derive(Error, Debug, Clone)]
pub enum ServerError {
    /// Failed to bind to address
    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

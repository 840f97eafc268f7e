//! HTTP gateway exposing conversation sessions to a web UI

pub mod chat;
pub mod health;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::GeminiConfig;
use crate::store::SessionStore;

/// Maximum accepted request body (base64 reference images are large)
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Shared state for API handlers
#[derive(Debug)]
pub struct ApiState {
    pub sessions: SessionStore,
}

impl ApiState {
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            sessions: SessionStore::new(config),
        }
    }
}

/// Build the `/api` router without static files or middleware
pub fn api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .nest("/api", chat::router(state).merge(health::router()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Create a server for the given upstream configuration
    #[must_use]
    pub fn new(config: GeminiConfig, port: u16) -> Self {
        Self {
            state: Arc::new(ApiState::new(config)),
            port,
            static_dir: None,
        }
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let mut router = api_router(self.state.clone());

        // Serve static files if configured, falling back to the SPA entry point
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

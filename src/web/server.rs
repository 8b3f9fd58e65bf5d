//! HTTP server for Cabinet.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::file::FileStorage;
use crate::{CabinetError, Database, Result};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::create_router;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, db: Database, storage: FileStorage) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| CabinetError::Config(format!("invalid server address: {e}")))?;

        let app_state = AppState::new(
            db,
            storage,
            &config.web.jwt_secret,
            config.web.jwt_access_token_expiry_secs,
        )
        .with_max_upload_size(config.files.max_upload_size_bytes());

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state: Arc::new(JwtState::new(&config.web.jwt_secret)),
            cors_origins: config.web.cors_origins.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the router without binding a socket.
    pub fn router(&self) -> Router {
        create_router(
            self.app_state.clone(),
            self.jwt_state.clone(),
            &self.cors_origins,
        )
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await?;
        Ok(())
    }
}

//! HTTP server lifecycle.
//!
//! The server binds a TCP listener for the configured address, opens the
//! storage root and serves the router until the shutdown future resolves.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::warn;

use crate::config::Config;
use crate::router::{build_router, AppState};

/// Age after which a leftover upload temp file is removed at startup.
pub const STALE_UPLOAD_AGE: Duration = Duration::from_secs(60 * 60);

/// A bound HTTP server over one storage root.
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Open the storage root and bind the listener.
    ///
    /// The root directory is created if it does not exist, and stale upload
    /// temp files from a previous run are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The listen address is invalid
    /// - The storage root cannot be created or is not a directory
    /// - The address cannot be bound
    pub async fn bind(config: Config) -> Result<Self> {
        let addr = config.server.listen_addr()?;
        let root = config.storage.root_dir.clone();

        let state = Arc::new(
            AppState::new(config)
                .with_context(|| format!("Failed to open storage root: {}", root.display()))?,
        );

        if let Err(e) = state.transfer().cleanup_stale_uploads(STALE_UPLOAD_AGE) {
            warn!("Failed to clean up stale uploads: {}", e);
        }

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        let router = build_router(Arc::clone(&state));

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The shared application state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Serve requests until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

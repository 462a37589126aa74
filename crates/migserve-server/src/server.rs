use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use migserve_common::{Catalog, Error, Result};
use migserve_config::ServerConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::{AppState, SharedState};

/// The listing service before it owns a socket.
pub struct ListingServer {
    config: ServerConfig,
    catalog: Catalog,
}

impl ListingServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            catalog: Catalog::builtin(),
        }
    }

    /// Bind the listening socket. Fails if the address is already in use.
    pub async fn bind(self) -> Result<BoundServer> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let state = Arc::new(AppState::new(&self.config, &self.catalog)?);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(format!("failed to bind {addr}: {e}")))?;
        let local_addr = listener.local_addr()?;
        info!(
            "listing service bound to {} ({} records, location field `{}`)",
            local_addr, state.record_count, state.location_field
        );

        Ok(BoundServer {
            listener,
            state,
            local_addr,
        })
    }

    pub async fn run(self) -> Result<()> {
        self.bind().await?.serve().await
    }
}

/// A listing service holding its socket, ready to accept connections.
pub struct BoundServer {
    listener: TcpListener,
    state: SharedState,
    local_addr: SocketAddr,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending::<()>()).await
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = build_router(self.state);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| Error::Server(format!("server error: {e}")))?;

        info!("listing service on {} stopped", self.local_addr);
        Ok(())
    }
}

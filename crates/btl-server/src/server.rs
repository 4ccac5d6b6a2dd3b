//! Server setup and lifecycle management.

use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use btl_config::Config;

use crate::bridge;
use crate::routes::{cors_layer, create_router};
use crate::state::AppState;

/// The btl HTTP service.
#[derive(Debug)]
pub struct Server {
    state: AppState,
    listen_addr: SocketAddr,
    cors_origins: Vec<String>,
}

impl Server {
    /// Build the service from resolved configuration.
    ///
    /// # Errors
    ///
    /// Fails if the listen address does not parse or a client cannot be
    /// built.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_addr = config
            .server
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address {}", config.server.listen_addr))?;
        Ok(Self {
            state: bridge::build_state(config)?,
            listen_addr,
            cors_origins: config.server.cors_origins.clone(),
        })
    }

    /// Override the listen address.
    #[must_use]
    pub fn listen_on(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Address the server binds to.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Bind and serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound or the server stops abnormally.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", self.listen_addr))?;
        self.run_on(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Fails if the server stops abnormally.
    pub async fn run_on<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cors_origins.is_empty() {
            info!("no CORS origins configured; cross-origin requests are refused");
        }
        let app = create_router(self.state, cors_layer(&self.cors_origins));

        let addr = listener.local_addr()?;
        info!(%addr, "btl listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("server error")?;

        info!("btl shut down");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            info!("received terminate signal, initiating graceful shutdown");
        },
    }
}

//! Bastion RBAC gateway
//!
//! An axum server that puts every API request through a fixed pipeline of
//! gates before it reaches a handler, and records an audit trail of what
//! was attempted and what was done.
//!
//! # Pipeline
//!
//! - **Correlation**: tags the request with a correlation id and logs entry/exit
//! - **Authentication**: bearer token to a live [`Identity`](middleware::auth::Identity)
//! - **Authorization**: role-set or named-permission gate
//! - **Ownership**: per-resource owner check, or a collection filter
//! - **Audit**: records successful mutations after the response is produced
//!
//! Denials at the authorization and ownership gates are audited too.
//! Audit submission never blocks or fails a request.

#![warn(clippy::all)]

pub mod config;
pub mod directory;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use anyhow::Context;
use axum::Router;
use bastion_audit_capture::{spawn_writer, AuditSink};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long shutdown waits for the audit writer to drain.
const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Server builder for constructing and running the API server.
pub struct Server {
    config: ServerConfig,
    state: AppState,
    router: Router,
    writer: JoinHandle<()>,
}

impl Server {
    /// Create a new server with the given configuration.
    ///
    /// Must be called inside a Tokio runtime: the audit writer is spawned here.
    pub async fn new(config: ServerConfig) -> Result<Self, anyhow::Error> {
        let (state, receiver) = AppState::new(&config).await?;
        Self::assemble(config, state, receiver)
    }

    /// Create a server that persists audit entries to `sink`.
    pub fn with_sink(
        config: ServerConfig,
        sink: Arc<dyn AuditSink>,
    ) -> Result<Self, anyhow::Error> {
        let (state, receiver) = AppState::with_sink(&config, sink)?;
        Self::assemble(config, state, receiver)
    }

    fn assemble(
        config: ServerConfig,
        state: AppState,
        receiver: tokio::sync::mpsc::Receiver<bastion_audit_capture::AuditEntry>,
    ) -> Result<Self, anyhow::Error> {
        let router = routes::create_router(
            state.clone(),
            Duration::from_secs(config.server.request_timeout_secs),
        )
        .context("Failed to build routes")?;
        let writer = spawn_writer(receiver, state.audit_sink.clone());
        Ok(Self {
            config,
            state,
            router,
            writer,
        })
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared state, for seeding and inspection.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, binding to the configured address.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.addr()?;
        let listener = TcpListener::bind(addr).await?;

        info!("Server listening on {}", addr);

        let Self {
            state,
            router,
            writer,
            ..
        } = self;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        // Dropping the last capture handle closes the channel so the writer
        // can finish what is buffered.
        drop(state);
        if tokio::time::timeout(AUDIT_DRAIN_TIMEOUT, writer).await.is_err() {
            warn!("Audit writer did not drain before timeout");
        }

        Ok(())
    }

    /// Get the server's socket address.
    pub fn addr(&self) -> Result<SocketAddr, anyhow::Error> {
        Ok(self.config.server.socket_addr()?)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown");
}

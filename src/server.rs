//! Combined multi-transport server lifecycle.
//!
//! [`Server`] owns the shared core (tool directory, processor, broadcast
//! manager, metrics) and runs the selected transports concurrently, each
//! on its own task. All transports share one shutdown broadcast channel:
//! a termination signal, or the first transport to exit on its own, stops
//! the rest. Shutdown is bounded by the configured timeout; tasks still
//! running after the deadline are aborted.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::streamable::{self, StreamableState};
use crate::http::{rest_router, websocket, OriginPolicy, RequestMetrics};
use crate::mcp::{BroadcastManager, Processor, StdioServer};
use crate::tools::ToolDirectory;

/// Which transports to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportSelection {
    /// Line-delimited JSON-RPC over stdin/stdout.
    pub stdio: bool,
    /// REST convenience API.
    pub http: bool,
    /// Streamable HTTP (POST + SSE).
    pub streamable: bool,
    /// WebSocket.
    pub websocket: bool,
}

impl TransportSelection {
    /// All transports enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            stdio: true,
            http: true,
            streamable: true,
            websocket: true,
        }
    }

    /// Whether any transport is enabled.
    #[must_use]
    pub const fn any(self) -> bool {
        self.stdio || self.http || self.streamable || self.websocket
    }
}

/// The multi-transport server.
pub struct Server {
    config: ServerConfig,
    selection: TransportSelection,
    directory: Arc<ToolDirectory>,
    processor: Arc<Processor>,
    broadcast: Arc<BroadcastManager>,
    metrics: Arc<RequestMetrics>,
}

impl Server {
    /// Wires the shared core around the given tool directory.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        selection: TransportSelection,
        directory: Arc<ToolDirectory>,
    ) -> Self {
        let processor = Arc::new(Processor::new(Arc::clone(&directory)));
        Self {
            config,
            selection,
            directory,
            processor,
            broadcast: Arc::new(BroadcastManager::new()),
            metrics: Arc::new(RequestMetrics::new()),
        }
    }

    /// Runs the selected transports until a termination signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if a listener cannot be bound or a transport fails.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs the selected transports until `shutdown` resolves or a transport
    /// exits on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if a listener cannot be bound or a transport fails.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        if !self.selection.any() {
            warn!("No transports selected, nothing to do");
            return Ok(());
        }

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let mut tasks: JoinSet<Result<(), ServerError>> = JoinSet::new();

        // Bind every listener before spawning anything, so a port conflict
        // fails startup as a whole rather than one transport silently dying.
        if self.selection.http {
            let addr = self.config.http_addr();
            let listener = bind(addr).await?;
            let router = rest_router(Arc::clone(&self.directory), Arc::clone(&self.metrics));
            info!(%addr, "HTTP API listening");
            tasks.spawn(serve(addr, listener, router, shutdown_tx.subscribe()));
        }

        if self.selection.streamable {
            let addr = self.config.streamable_addr();
            let listener = bind(addr).await?;
            let state = StreamableState {
                processor: Arc::clone(&self.processor),
                broadcast: Arc::clone(&self.broadcast),
                metrics: Arc::clone(&self.metrics),
            };
            let policy = OriginPolicy::new(
                self.config.enable_origin_check,
                self.config.allowed_origins.clone(),
            );
            let router = streamable::router(state, policy);
            info!(%addr, "Streamable HTTP listening");
            tasks.spawn(serve(addr, listener, router, shutdown_tx.subscribe()));
        }

        if self.selection.websocket {
            let addr = self.config.websocket_addr();
            let listener = bind(addr).await?;
            let router = websocket::router(Arc::clone(&self.processor));
            info!(%addr, "WebSocket listening");
            tasks.spawn(serve(addr, listener, router, shutdown_tx.subscribe()));
        }

        if self.selection.stdio {
            let stdio = StdioServer::new(Arc::clone(&self.processor));
            let rx = shutdown_tx.subscribe();
            tasks.spawn(async move {
                stdio
                    .run(rx)
                    .await
                    .map_err(|source| ServerError::Stdio { source })
            });
        }

        let mut first_error = None;

        tokio::select! {
            () = shutdown => {
                info!("Shutdown requested");
            }
            Some(finished) = tasks.join_next() => {
                // A transport finished on its own (stdio EOF, or a failure);
                // take down the rest.
                first_error = collect_outcome(finished);
            }
        }

        // Fan the shutdown out and give the remaining tasks one bounded
        // window to drain.
        let _ = shutdown_tx.send(());

        let drain = async {
            while let Some(finished) = tasks.join_next().await {
                if let Some(e) = collect_outcome(finished) {
                    first_error.get_or_insert(e);
                }
            }
        };

        if tokio::time::timeout(self.config.shutdown_timeout(), drain)
            .await
            .is_err()
        {
            warn!(
                timeout_secs = self.config.shutdown_timeout_secs,
                "Shutdown timeout exceeded, aborting remaining transports"
            );
            tasks.abort_all();
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("All transports stopped");
                Ok(())
            }
        }
    }
}

/// Binds a TCP listener, converting the failure into a startup error.
async fn bind(addr: std::net::SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serves an axum router on a bound listener until the shutdown signal.
async fn serve(
    addr: std::net::SocketAddr,
    listener: TcpListener,
    router: axum::Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(|source| ServerError::Http { addr, source })
}

/// Logs and extracts the error, if any, from a finished transport task.
fn collect_outcome(
    finished: Result<Result<(), ServerError>, tokio::task::JoinError>,
) -> Option<ServerError> {
    match finished {
        Ok(Ok(())) => None,
        Ok(Err(e)) => {
            error!(error = %e, "Transport failed");
            Some(e)
        }
        Err(join_error) => {
            error!(error = %join_error, "Transport task panicked");
            Some(ServerError::Task {
                message: join_error.to_string(),
            })
        }
    }
}

/// Resolves when the process receives a termination signal.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to install SIGINT handler");
            return std::future::pending().await;
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = interrupt.recv() => info!("Received SIGINT"),
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to wait for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Received ctrl-c");
}

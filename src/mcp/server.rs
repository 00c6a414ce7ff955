//! stdio server loop.
//!
//! A single sequential read-decode-dispatch-write loop over the stdio
//! transport. The only suspension points are the blocking line read and
//! the shutdown signal, checked once per loop turn; a read already in
//! flight when shutdown arrives completes one final iteration.
//!
//! The loop enforces the initialise-first ordering the processor itself
//! deliberately does not: requests arriving before `initialize` are
//! answered with an invalid-request error.

use std::io;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::processor::Processor;
use super::protocol::{decode_envelope, Envelope, ErrorCode, Reply};
use super::transport::StdioTransport;

/// Server state in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for the initialize request.
    AwaitingInit,
    /// Initialize received, waiting for the initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// The stdio JSON-RPC server.
pub struct StdioServer {
    /// Current lifecycle state.
    state: ServerState,
    /// The transport layer.
    transport: StdioTransport,
    /// Transport-independent request dispatch.
    processor: Arc<Processor>,
}

impl StdioServer {
    /// Creates a new stdio server over the given processor.
    #[must_use]
    pub fn new(processor: Arc<Processor>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport: StdioTransport::new(),
            processor,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Runs the main loop until EOF or the shutdown signal fires.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        info!("stdio transport ready, waiting for client");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("stdio transport shutting down");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    let Some(line) = line_result? else {
                        debug!("stdin closed, stdio transport done");
                        self.state = ServerState::ShuttingDown;
                        return Ok(());
                    };

                    if line.trim().is_empty() {
                        continue;
                    }

                    self.handle_line(&line).await?;
                }
            }
        }
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> io::Result<()> {
        match decode_envelope(line) {
            Ok(envelope) => self.handle_envelope(&envelope).await,
            Err(reply) => self.transport.write_message(&reply).await,
        }
    }

    /// Applies lifecycle ordering, then dispatches to the processor.
    async fn handle_envelope(&mut self, envelope: &Envelope) -> io::Result<()> {
        let method = envelope.method.as_deref();

        let reply = match (self.state, method) {
            // First message must be initialize.
            (ServerState::AwaitingInit, Some("initialize")) => {
                self.state = ServerState::Initialising;
                self.processor.process(envelope)
            }
            (ServerState::AwaitingInit, _) => envelope.id.clone().map(|id| {
                Reply::error_with_message(
                    Some(id),
                    ErrorCode::InvalidRequest,
                    "Server not initialized",
                )
            }),

            // Repeated initialize after the handshake is a protocol error.
            (ServerState::Initialising | ServerState::Running, Some("initialize")) => {
                envelope.id.clone().map(|id| {
                    Reply::error_with_message(
                        Some(id),
                        ErrorCode::InvalidRequest,
                        "Server already initialized",
                    )
                })
            }

            (ServerState::Initialising, Some("initialized" | "notifications/initialized")) => {
                self.state = ServerState::Running;
                debug!("Session initialised");
                None
            }

            _ => self.processor.process(envelope),
        };

        if let Some(reply) = reply {
            self.transport.write_message(&reply).await?;
        }
        Ok(())
    }
}

//! Error types for mcp-tools-server.
//!
//! Protocol-level failures (bad envelopes, unknown methods, bad params) are
//! *not* represented here — those are converted into JSON-RPC error replies
//! by the processor and never propagate as Rust errors. The types below
//! cover configuration, tool construction/execution, and the broadcast
//! registry.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors produced by tool construction or execution.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The requested tool is not present in the directory.
    #[error("tool not found: {name}")]
    NotFound {
        /// Name the caller asked for.
        name: String,
    },

    /// The tool ran but reported a failure.
    #[error("{message}")]
    Execution {
        /// The tool's own failure message.
        message: String,
    },

    /// No tool in the registry could be constructed at startup.
    #[error("no tools could be created: {details}")]
    NoToolsAvailable {
        /// Per-builder failure summaries.
        details: String,
    },
}

/// Errors returned by the broadcast manager's point-to-point send path.
///
/// `Broadcast` itself is infallible by contract: full mailboxes are skipped,
/// not reported.
#[derive(Error, Debug)]
pub enum BroadcastError {
    /// No live client is registered under this identifier.
    #[error("client not found: {id}")]
    ClientNotFound {
        /// The client identifier.
        id: String,
    },

    /// The client's mailbox closed while the send was in flight.
    #[error("client mailbox closed: {id}")]
    ClientClosed {
        /// The client identifier.
        id: String,
    },

    /// The mailbox stayed full for the whole send timeout.
    #[error("timeout sending message to client {id}")]
    SendTimeout {
        /// The client identifier.
        id: String,
    },
}

/// Errors that terminate a transport server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A TCP listener could not be bound.
    #[error("failed to bind {addr}")]
    Bind {
        /// The address that could not be bound.
        addr: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The stdio transport failed.
    #[error("stdio transport error")]
    Stdio {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An HTTP server failed while serving.
    #[error("HTTP server error on {addr}")]
    Http {
        /// The address the server was bound to.
        addr: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A transport task panicked or was aborted.
    #[error("transport task failed: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_display() {
        let error = ToolError::NotFound {
            name: "nope".to_string(),
        };
        assert_eq!(error.to_string(), "tool not found: nope");
    }

    #[test]
    fn broadcast_timeout_display() {
        let error = BroadcastError::SendTimeout {
            id: "abc-123".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("timeout"));
        assert!(msg.contains("abc-123"));
    }

    #[test]
    fn config_validation_display() {
        let error = ConfigError::Validation {
            message: "http_port must not be 0".to_string(),
        };
        assert!(error.to_string().contains("http_port"));
    }
}

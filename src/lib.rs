//! mcp-tools-server: multi-transport JSON-RPC tool-invocation server
//!
//! This library exposes a small catalogue of utility tools over four
//! transports that share one protocol core:
//!
//! - **stdio** — line-delimited JSON-RPC for MCP clients
//! - **HTTP REST** — convenience endpoints for `curl`-style testing
//! - **Streamable HTTP** — JSON-RPC over POST with SSE push
//! - **WebSocket** — JSON-RPC over a bidirectional socket
//!
//! # Architecture
//!
//! Every transport decodes its input into an [`mcp::Envelope`] and hands it
//! to the shared [`mcp::Processor`]; only framing and session handling are
//! transport-specific. The streamable transport additionally fans replies
//! out to subscribed event streams through the [`mcp::BroadcastManager`].
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`http`] — REST, streamable HTTP, and WebSocket transports
//! - [`mcp`] — Protocol core, stdio transport, broadcast manager
//! - [`server`] — Combined multi-transport lifecycle
//! - [`tools`] — Tool trait, registry, and built-in tools

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod server;
pub mod tools;

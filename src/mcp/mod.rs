//! JSON-RPC 2.0 request processing and session management.
//!
//! This module holds the transport-independent core of the server and its
//! stdio binding:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  transports: stdio / REST / streamable HTTP / WebSocket      │
//! │        │                │                     │              │
//! │        ▼                ▼                     ▼              │
//! │   ┌──────────┐    ┌───────────┐       ┌──────────────┐      │
//! │   │ Envelope │───▶│ Processor │       │  Broadcast   │      │
//! │   │ (decode) │    │ (dispatch)│       │  Manager     │      │
//! │   └──────────┘    └───────────┘       │ (SSE fan-out)│      │
//! │                         │             └──────────────┘      │
//! │                         ▼                                    │
//! │                  ┌──────────────┐                            │
//! │                  │ToolDirectory │                            │
//! │                  └──────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`processor::Processor`] turns one decoded envelope into at most one
//! reply; the [`broadcast::BroadcastManager`] fans server-generated messages
//! out to connected event-stream clients with bounded, non-blocking
//! delivery. Both are safe for concurrent use from any number of transport
//! tasks.
//!
//! # Protocol Version
//!
//! This implementation targets protocol version 2024-11-05.

pub mod broadcast;
pub mod processor;
pub mod protocol;
pub mod server;
pub mod transport;

pub use broadcast::{BroadcastManager, ClientHandle};
pub use processor::Processor;
pub use protocol::{decode_envelope, Envelope, Reply, RequestId, PROTOCOL_VERSION};
pub use server::StdioServer;
pub use transport::StdioTransport;

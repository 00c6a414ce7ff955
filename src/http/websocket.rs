//! WebSocket transport: JSON-RPC over a bidirectional socket.
//!
//! One endpoint (`/ws`); each inbound text frame is one JSON-RPC request,
//! each outbound text frame its reply. Notifications produce no frame.
//! The connection is held open for the session; a close frame or socket
//! error ends the task for that connection only.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::mcp::processor::Processor;
use crate::mcp::protocol::decode_envelope;

/// Shared state for the WebSocket transport.
#[derive(Clone)]
pub struct WsState {
    /// Transport-independent request dispatch.
    pub processor: Arc<Processor>,
}

/// Builds the WebSocket router.
#[must_use]
pub fn router(processor: Arc<Processor>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(WsState { processor })
        .layer(TraceLayer::new_for_http())
}

/// `GET /ws` — upgrades the connection and hands it to the session loop.
async fn ws_handler(State(state): State<WsState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.processor))
}

/// Per-connection session loop: strictly sequential request/reply.
async fn handle_socket(mut socket: WebSocket, processor: Arc<Processor>) {
    debug!("WebSocket session opened");

    while let Some(frame) = socket.recv().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                // Transport error: fatal to this connection only.
                debug!(error = %e, "WebSocket read failed, closing session");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                if let Some(reply) = process_frame(&processor, &text) {
                    if let Err(e) = socket.send(Message::Text(reply)).await {
                        warn!(error = %e, "WebSocket write failed, closing session");
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            // Pings are answered by axum automatically; binary frames are
            // not part of the protocol.
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    debug!("WebSocket session closed");
}

/// Decodes and dispatches one text frame; returns the serialized reply, if
/// one is due.
fn process_frame(processor: &Processor, text: &str) -> Option<String> {
    let reply = match decode_envelope(text) {
        Ok(envelope) => processor.process(&envelope)?,
        Err(error_reply) => error_reply,
    };

    match serde_json::to_string(&reply) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "Failed to serialise reply");
            None
        }
    }
}

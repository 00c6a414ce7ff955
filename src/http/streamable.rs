//! Streamable HTTP transport: JSON-RPC over POST with SSE push.
//!
//! One endpoint, two verbs:
//!
//! - `POST /mcp` — one JSON-RPC request per call. A reply-bearing request
//!   is answered in the HTTP response body (200) and the reply is also
//!   broadcast to every open event stream; a notification is acknowledged
//!   with an empty 202.
//! - `GET /mcp` — opens a Server-Sent-Events stream of broadcast messages
//!   (`data: <json>` frames), held open until the client disconnects. The
//!   client is registered with the broadcast manager for the lifetime of
//!   the stream and removed when the connection drops.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::mcp::broadcast::BroadcastManager;
use crate::mcp::processor::Processor;
use crate::mcp::protocol::{decode_envelope, Reply};

use super::metrics::RequestMetrics;
use super::security::{check_origin, OriginPolicy};

/// Shared state for the streamable transport.
#[derive(Clone)]
pub struct StreamableState {
    /// Transport-independent request dispatch.
    pub processor: Arc<Processor>,
    /// Event-stream client registry.
    pub broadcast: Arc<BroadcastManager>,
    /// Request counters, injected at construction.
    pub metrics: Arc<RequestMetrics>,
}

/// Builds the streamable HTTP router.
#[must_use]
pub fn router(state: StreamableState, policy: OriginPolicy) -> Router {
    Router::new()
        .route("/mcp", get(sse_handler).post(post_handler))
        .with_state(state)
        .layer(middleware::from_fn_with_state(policy, check_origin))
        .layer(TraceLayer::new_for_http())
}

/// `POST /mcp` — synchronous JSON-RPC exchange plus SSE fan-out.
async fn post_handler(State(state): State<StreamableState>, body: String) -> Response {
    state.metrics.record_rpc();

    let envelope = match decode_envelope(&body) {
        Ok(envelope) => envelope,
        Err(reply) => {
            // Not decodable as a message at all; the reply carries the
            // parse/invalid-request error and no id.
            return (StatusCode::BAD_REQUEST, Json(reply)).into_response();
        }
    };

    match state.processor.process(&envelope) {
        Some(reply) => {
            fan_out(&state.broadcast, &reply).await;
            (StatusCode::OK, Json(reply)).into_response()
        }
        // Notification: accepted, nothing to answer.
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Broadcasts a serialized reply to all open event streams, best-effort.
async fn fan_out(broadcast: &BroadcastManager, reply: &Reply) {
    match serde_json::to_string(reply) {
        Ok(json) => broadcast.broadcast(&json).await,
        Err(e) => warn!(error = %e, "Failed to serialise reply for broadcast"),
    }
}

/// `GET /mcp` — long-lived SSE stream of broadcast messages.
async fn sse_handler(
    State(state): State<StreamableState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let handle = state.broadcast.add_client().await;
    debug!(client_id = %handle.id, "Event stream opened");

    let stream = ClientEventStream {
        inner: ReceiverStream::new(handle.mailbox),
        _guard: ClientGuard {
            id: handle.id,
            manager: Arc::clone(&state.broadcast),
        },
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Removes the client from the registry when the stream is dropped,
/// i.e. when the HTTP connection closes for any reason.
struct ClientGuard {
    id: String,
    manager: Arc<BroadcastManager>,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        let manager = Arc::clone(&self.manager);
        let id = std::mem::take(&mut self.id);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                debug!(client_id = %id, "Event stream closed");
                manager.remove_client(&id).await;
            });
        }
    }
}

/// Mailbox-backed SSE event stream with removal tied to its lifetime.
struct ClientEventStream {
    inner: ReceiverStream<String>,
    _guard: ClientGuard,
}

impl Stream for ClientEventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner)
            .poll_next(cx)
            .map(|next| next.map(|msg| Ok(Event::default().data(msg))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolDirectory, UuidGen};

    fn state() -> StreamableState {
        let directory = ToolDirectory::from_tools(vec![Box::new(UuidGen::new())]);
        StreamableState {
            processor: Arc::new(Processor::new(Arc::new(directory))),
            broadcast: Arc::new(BroadcastManager::new()),
            metrics: Arc::new(RequestMetrics::new()),
        }
    }

    #[tokio::test]
    async fn post_request_answers_200() {
        let state = state();
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#.to_string();
        let response = post_handler(State(state.clone()), body).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.metrics.snapshot().rpc_requests, 1);
    }

    #[tokio::test]
    async fn post_notification_answers_202() {
        let state = state();
        let body = r#"{"jsonrpc":"2.0","method":"initialized"}"#.to_string();
        let response = post_handler(State(state), body).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn post_invalid_json_answers_400() {
        let state = state();
        let response = post_handler(State(state), "not json".to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_reply_is_broadcast_to_streams() {
        let state = state();
        let mut handle = state.broadcast.add_client().await;

        let body = r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#.to_string();
        post_handler(State(state.clone()), body).await;

        let pushed = handle.mailbox.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&pushed).unwrap();
        assert_eq!(value["id"], 7);
        assert!(value["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn guard_drop_removes_client() {
        let state = state();
        let handle = state.broadcast.add_client().await;
        assert_eq!(state.broadcast.client_count().await, 1);

        let guard = ClientGuard {
            id: handle.id,
            manager: Arc::clone(&state.broadcast),
        };
        drop(guard);

        // Removal runs on a spawned task; poll until it lands.
        for _ in 0..50 {
            if state.broadcast.client_count().await == 0 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("client was not removed after guard drop");
    }

    #[tokio::test]
    async fn router_builds() {
        let _router = router(state(), OriginPolicy::new(false, vec![]));
    }
}

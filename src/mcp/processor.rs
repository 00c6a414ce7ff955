//! Transport-independent JSON-RPC request processor.
//!
//! Given one decoded [`Envelope`], the processor decides its method and
//! produces the corresponding [`Reply`], or `None` for notifications and
//! unanswerable malformed messages. It is stateless across calls, performs
//! no I/O beyond querying the tool directory and invoking the tool, and
//! never panics on malformed input. How the envelope arrived and how the
//! reply is delivered is entirely the transport adapter's concern.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::tools::{JsonMap, ToolDirectory};

use super::protocol::{Envelope, ErrorCode, Reply, RequestId, PROTOCOL_VERSION, SERVER_NAME};

/// A tool entry in `initialize` and `tools/list` replies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// The JSON-RPC request processor.
///
/// Cheap to clone via the shared directory; safe for concurrent use from
/// any number of transport tasks.
pub struct Processor {
    directory: Arc<ToolDirectory>,
}

impl Processor {
    /// Creates a processor over the given tool directory.
    #[must_use]
    pub const fn new(directory: Arc<ToolDirectory>) -> Self {
        Self { directory }
    }

    /// The tool directory this processor dispatches against.
    #[must_use]
    pub fn directory(&self) -> &Arc<ToolDirectory> {
        &self.directory
    }

    /// Top-level dispatch for one decoded message.
    ///
    /// Returns `None` when no reply is due: notifications (well-formed or
    /// not) are silently dropped, because without an `id` there is nothing
    /// to correlate an answer with.
    #[must_use]
    pub fn process(&self, envelope: &Envelope) -> Option<Reply> {
        if !envelope.is_well_formed() {
            return envelope.id.clone().map(|id| {
                self.error_response(Some(id), ErrorCode::InvalidRequest, "Invalid Request")
            });
        }

        let method = envelope.method.as_deref()?;

        match (method, envelope.id.clone()) {
            ("initialize", Some(id)) => Some(self.handle_initialize(id)),
            ("tools/list", Some(id)) => Some(self.handle_tools_list(id)),
            ("tools/call", Some(id)) => Some(self.handle_tools_call(envelope.params.as_ref(), id)),
            // The client's post-initialize acknowledgment. The absence of a
            // reply is itself meaningful.
            ("initialized" | "notifications/initialized", _) => {
                debug!("Client initialisation acknowledged");
                None
            }
            (other, Some(id)) => Some(self.error_response(
                Some(id),
                ErrorCode::MethodNotFound,
                format!("Method not found: {other}"),
            )),
            (other, None) => {
                // Unrecognised notifications are not errors.
                debug!(method = %other, "Ignoring unknown notification");
                None
            }
        }
    }

    /// Handles the `initialize` request. Always succeeds.
    #[must_use]
    pub fn handle_initialize(&self, id: RequestId) -> Reply {
        Reply::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": self.tool_definitions(),
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
    }

    /// Handles the `tools/list` request. Always succeeds.
    #[must_use]
    pub fn handle_tools_list(&self, id: RequestId) -> Reply {
        Reply::success(id, json!({ "tools": self.tool_definitions() }))
    }

    /// Handles the `tools/call` request.
    ///
    /// `params.name` is required; `params.arguments` defaults to an empty
    /// bag. Unknown tools and failing tools both answer with `-32000`.
    #[must_use]
    pub fn handle_tools_call(&self, params: Option<&Value>, id: RequestId) -> Reply {
        let Some(name) = params.and_then(|p| p.get("name")).and_then(Value::as_str) else {
            return self.error_response(
                Some(id),
                ErrorCode::InvalidParams,
                "Invalid params: missing tool name",
            );
        };

        let arguments: JsonMap = params
            .and_then(|p| p.get("arguments"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match self.directory.execute(name, &arguments) {
            Ok(result) => Reply::success(id, Value::Object(result)),
            Err(e) => self.error_response(
                Some(id),
                ErrorCode::ToolFailure,
                format!("Tool execution error: {e}"),
            ),
        }
    }

    /// Builds a standardised error reply, logging it on the way out.
    #[must_use]
    pub fn error_response(
        &self,
        id: Option<RequestId>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Reply {
        let message = message.into();
        error!(id = ?id, code = code.code(), message = %message, "Sending error response");
        Reply::error_with_message(id, code, message)
    }

    /// The tool list in the shape replies expect, sorted by name.
    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.directory
            .iter_sorted()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                // Generic schema placeholder; could be expanded per tool.
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::decode_envelope;
    use crate::tools::{ToolDirectory, UuidGen};

    fn processor() -> Processor {
        let directory = ToolDirectory::from_tools(vec![Box::new(UuidGen::new())]);
        Processor::new(Arc::new(directory))
    }

    fn process_json(json: &str) -> Option<Reply> {
        let envelope = decode_envelope(json).unwrap();
        processor().process(&envelope)
    }

    fn reply_value(reply: &Reply) -> Value {
        serde_json::to_value(reply).unwrap()
    }

    #[test]
    fn initialize_lists_every_tool() {
        let reply = process_json(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .unwrap();
        let value = reply_value(&reply);

        assert_eq!(value["id"], 1);
        assert_eq!(value["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(value["result"]["serverInfo"]["name"], SERVER_NAME);

        let tools = value["result"]["capabilities"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "generate_uuid");
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
    }

    #[test]
    fn tools_list_matches_directory() {
        let reply = process_json(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).unwrap();
        let value = reply_value(&reply);

        let tools = value["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["generate_uuid"]);
    }

    #[test]
    fn tools_call_returns_uuid() {
        let reply = process_json(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"generate_uuid"}}"#,
        )
        .unwrap();
        let value = reply_value(&reply);

        assert_eq!(value["id"], 1);
        let uuid = value["result"]["uuid"].as_str().unwrap();
        assert_eq!(uuid.len(), 36);
        assert_eq!(uuid.chars().filter(|&c| c == '-').count(), 4);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn sequential_uuid_calls_differ() {
        let request =
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"generate_uuid"}}"#;
        let first = reply_value(&process_json(request).unwrap());
        let second = reply_value(&process_json(request).unwrap());
        assert_ne!(first["result"]["uuid"], second["result"]["uuid"]);
    }

    #[test]
    fn tools_call_unknown_tool_is_tool_failure() {
        let reply = process_json(
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .unwrap();
        let value = reply_value(&reply);

        assert_eq!(value["id"], 5);
        assert_eq!(value["error"]["code"], -32000);
        assert!(value.get("result").is_none());
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("tool not found: nope"));
    }

    #[test]
    fn tools_call_missing_name_is_invalid_params() {
        let reply =
            process_json(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{}}"#).unwrap();
        let value = reply_value(&reply);
        assert_eq!(value["error"]["code"], -32602);
    }

    #[test]
    fn tools_call_non_string_name_is_invalid_params() {
        let reply = process_json(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":42}}"#,
        )
        .unwrap();
        let value = reply_value(&reply);
        assert_eq!(value["error"]["code"], -32602);
    }

    #[test]
    fn tools_call_without_params_is_invalid_params() {
        let reply = process_json(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call"}"#).unwrap();
        let value = reply_value(&reply);
        assert_eq!(value["error"]["code"], -32602);
    }

    #[test]
    fn missing_method_with_id_is_invalid_request() {
        let reply = process_json(r#"{"jsonrpc":"2.0","id":7}"#).unwrap();
        let value = reply_value(&reply);
        assert_eq!(value["id"], 7);
        assert_eq!(value["error"]["code"], -32600);
    }

    #[test]
    fn missing_method_without_id_is_dropped() {
        assert!(process_json(r#"{"jsonrpc":"2.0"}"#).is_none());
    }

    #[test]
    fn wrong_version_with_id_is_invalid_request() {
        let reply = process_json(r#"{"jsonrpc":"1.0","id":9,"method":"tools/list"}"#).unwrap();
        let value = reply_value(&reply);
        assert_eq!(value["error"]["code"], -32600);
    }

    #[test]
    fn unknown_method_with_id_is_method_not_found() {
        let reply = process_json(r#"{"jsonrpc":"2.0","id":4,"method":"bogus/method"}"#).unwrap();
        let value = reply_value(&reply);
        assert_eq!(value["error"]["code"], -32601);
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("bogus/method"));
    }

    #[test]
    fn unknown_notification_is_dropped() {
        assert!(process_json(r#"{"jsonrpc":"2.0","method":"bogus/notify"}"#).is_none());
    }

    #[test]
    fn initialized_notification_gets_no_reply() {
        assert!(process_json(r#"{"jsonrpc":"2.0","method":"initialized"}"#).is_none());
        assert!(
            process_json(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none()
        );
    }

    #[test]
    fn string_id_echoed_as_string() {
        let reply = process_json(r#"{"jsonrpc":"2.0","id":"req-1","method":"tools/list"}"#)
            .unwrap();
        assert_eq!(reply.id(), Some(&RequestId::String("req-1".to_string())));
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains(r#""id":"req-1""#));
    }

    #[test]
    fn numeric_id_echoed_as_number() {
        let reply = process_json(r#"{"jsonrpc":"2.0","id":11,"method":"tools/list"}"#).unwrap();
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains(r#""id":11"#));
    }

    #[test]
    fn unexpected_fields_are_ignored() {
        let reply = process_json(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","extra":true,"more":[1,2]}"#,
        )
        .unwrap();
        assert!(!reply.is_error());
    }
}

//! JSON-RPC 2.0 message types.
//!
//! This module defines the wire types shared by every transport. Incoming
//! traffic is decoded once at the boundary into an [`Envelope`] with
//! explicit optional fields; the processor decides from the envelope alone
//! whether it is a well-formed request, a notification, or a protocol
//! violation.
//!
//! # Message Types
//!
//! - **Request**: an envelope with an `id` — expects exactly one reply
//! - **Notification**: an envelope without an `id` — never receives a reply
//! - **Reply**: a success (`result`) or error (`error`) object, never both

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The protocol version advertised during initialisation.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "mcp-tools-server";

/// A JSON-RPC 2.0 request ID.
///
/// IDs round-trip type-preserving: a numeric id is echoed back as a number,
/// a string id as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A decoded JSON-RPC message, before validation.
///
/// Every field is optional so that malformed traffic still decodes into a
/// value the processor can classify: a missing `method` is an invalid
/// request, a missing `id` marks a notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// Must be "2.0" for the message to be well-formed.
    #[serde(default)]
    pub jsonrpc: Option<String>,

    /// Correlation token; absent for notifications.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// The method to invoke.
    #[serde(default)]
    pub method: Option<String>,

    /// Method-specific parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

impl Envelope {
    /// Whether the envelope carries the mandatory protocol fields.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.jsonrpc.as_deref() == Some("2.0") && self.method.is_some()
    }

    /// Whether this message is a notification (no reply expected).
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Standard JSON-RPC 2.0 error codes, plus the server-defined tool code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Tool not found or tool execution failed.
    ToolFailure,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ToolFailure => -32000,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ToolFailure => "Tool execution error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,
}

/// A successful JSON-RPC 2.0 reply.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessReply {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// Echo of the request's ID.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

/// A JSON-RPC 2.0 error reply.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// Echo of the request's ID, when one could be determined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The error details.
    pub error: ErrorObject,
}

/// An outgoing reply: exactly one of success or error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// A success reply carrying `result`.
    Success(SuccessReply),
    /// An error reply carrying `error`.
    Error(ErrorReply),
}

impl Reply {
    /// Creates a success reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Success(SuccessReply {
            jsonrpc: "2.0",
            id,
            result,
        })
    }

    /// Creates an error reply with the code's default message.
    #[must_use]
    pub fn error(id: Option<RequestId>, code: ErrorCode) -> Self {
        Self::error_with_message(id, code, code.default_message())
    }

    /// Creates an error reply with a custom message.
    #[must_use]
    pub fn error_with_message(
        id: Option<RequestId>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self::Error(ErrorReply {
            jsonrpc: "2.0",
            id,
            error: ErrorObject {
                code: code.code(),
                message: message.into(),
            },
        })
    }

    /// The request ID this reply corresponds to, when known.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Option::as_ref is not const
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Success(s) => Some(&s.id),
            Self::Error(e) => e.id.as_ref(),
        }
    }

    /// Whether this reply carries an error object.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Decodes one JSON text into an envelope.
///
/// # Errors
///
/// Returns a parse-error [`Reply`] when the text is not valid JSON, and an
/// invalid-request [`Reply`] when it is valid JSON but not an object.
pub fn decode_envelope(json: &str) -> Result<Envelope, Reply> {
    let value: Value = serde_json::from_str(json)
        .map_err(|_| Reply::error(None, ErrorCode::ParseError))?;

    if !value.is_object() {
        return Err(Reply::error(None, ErrorCode::InvalidRequest));
    }

    // All envelope fields are optional, so deserialisation can only fail on
    // a field of the wrong type (e.g. a boolean id).
    serde_json::from_value(value).map_err(|_| Reply::error(None, ErrorCode::InvalidRequest))
}

//! JSON-RPC 2.0 messages used by the start and stop handshakes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-connection request identifier sequence, starting at 1.
#[derive(Debug)]
pub(crate) struct RequestIds {
    next: i64,
}

impl RequestIds {
    pub(crate) const fn new() -> Self {
        Self { next: 1 }
    }

    pub(crate) fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonRpcRequest {
    pub(crate) jsonrpc: &'static str,
    pub(crate) id: i64,
    pub(crate) method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) params: Option<Value>,
}

impl JsonRpcRequest {
    pub(crate) fn new(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 notification (no response expected).
#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonRpcNotification {
    pub(crate) jsonrpc: &'static str,
    pub(crate) method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) params: Option<Value>,
}

impl JsonRpcNotification {
    pub(crate) fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response message.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonRpcResponse {
    pub(crate) id: Option<i64>,
    #[serde(default)]
    pub(crate) result: Option<Value>,
    #[serde(default)]
    pub(crate) error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonRpcError {
    pub(crate) code: i64,
    pub(crate) message: String,
}

/// Any message the worker may send back.
#[derive(Debug, Clone)]
pub(crate) enum JsonRpcMessage {
    Response(JsonRpcResponse),
    ServerRequest { method: String },
    Notification { method: String },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
}

impl JsonRpcMessage {
    /// Classifies a payload by the presence of `method` and `id`.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        match (envelope.method, envelope.id) {
            (Some(method), Some(_)) => Ok(Self::ServerRequest { method }),
            (Some(method), None) => Ok(Self::Notification { method }),
            (None, _) => serde_json::from_slice(bytes).map(Self::Response),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn ids_start_at_one_per_connection() {
        let mut first = RequestIds::new();
        let mut second = RequestIds::new();

        assert_eq!(first.next_id(), 1);
        assert_eq!(first.next_id(), 2);
        assert_eq!(second.next_id(), 1);
    }

    #[rstest]
    fn request_omits_absent_params() {
        let json = serde_json::to_string(&JsonRpcRequest::new(7, "shutdown", None))
            .expect("serialise");

        assert_eq!(json, r#"{"jsonrpc":"2.0","id":7,"method":"shutdown"}"#);
    }

    #[rstest]
    fn notification_has_no_id() {
        let json = serde_json::to_string(&JsonRpcNotification::new("initialized", Some(json!({}))))
            .expect("serialise");

        assert!(json.contains(r#""method":"initialized""#));
        assert!(!json.contains("\"id\""));
    }

    #[rstest]
    #[case(r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{}}}"#, "response")]
    #[case(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"bad"}}"#, "response")]
    #[case(r#"{"jsonrpc":"2.0","method":"window/logMessage","params":{}}"#, "notification")]
    #[case(r#"{"jsonrpc":"2.0","id":"a","method":"client/registerCapability"}"#, "request")]
    fn classifies_messages(#[case] raw: &str, #[case] expected: &str) {
        let message = JsonRpcMessage::from_bytes(raw.as_bytes()).expect("parse");

        let kind = match message {
            JsonRpcMessage::Response(_) => "response",
            JsonRpcMessage::Notification { .. } => "notification",
            JsonRpcMessage::ServerRequest { .. } => "request",
        };
        assert_eq!(kind, expected);
    }

    #[rstest]
    fn error_responses_keep_code_and_message() {
        let raw = br#"{"jsonrpc":"2.0","id":3,"error":{"code":-32602,"message":"Invalid params"}}"#;

        let JsonRpcMessage::Response(response) = JsonRpcMessage::from_bytes(raw).expect("parse")
        else {
            panic!("expected a response");
        };

        let error = response.error.expect("error present");
        assert_eq!(response.id, Some(3));
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "Invalid params");
    }
}

//! JSON-RPC 2.0 protocol types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};

/// Protocol version string carried by every response.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version announced by `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const INTERNAL_ERROR: i32 = -32603;

// Locally answered methods
pub const INITIALIZE: &str = "initialize";
pub const PROMPTS_LIST: &str = "prompts/list";
pub const RESOURCES_LIST: &str = "resources/list";
pub const PING: &str = "ping";

/// Methods with this prefix are notifications and never get a reply.
pub const NOTIFICATION_PREFIX: &str = "notifications/";

/// Inbound JSON-RPC request or notification
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    /// Protocol version, normally "2.0"; carried as-is, never checked
    #[serde(default)]
    pub jsonrpc: Option<Value>,
    /// Method name (e.g., "tools/list", "notifications/initialized")
    pub method: String,
    /// Request ID, absent for notifications
    #[serde(default)]
    pub id: Option<Value>,
    /// Method parameters, passed through untouched
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    /// Validate a decoded frame as a JSON-RPC message.
    ///
    /// Borrows the value so the caller can still forward the complete
    /// message, unknown fields included.
    pub fn from_value(value: &Value) -> BridgeResult<Self> {
        if !value.is_object() {
            return Err(BridgeError::InvalidRequest(
                "message must be a JSON object".to_string(),
            ));
        }
        Self::deserialize(value).map_err(|e| BridgeError::InvalidRequest(e.to_string()))
    }

    /// Whether the method is in the reserved `notifications/` namespace.
    pub fn is_notification(&self) -> bool {
        self.method.starts_with(NOTIFICATION_PREFIX)
    }

    /// The id to echo back, `null` when the message carried none.
    pub fn reply_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// Outbound JSON-RPC response built by the bridge itself
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Always "2.0"
    pub jsonrpc: &'static str,
    /// ID of the triggering request, or null
    pub id: Value,
    /// Result on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Create a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response from a ready-made error object
    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Create an error response describing a bridge failure
    pub fn failure(id: Value, err: &BridgeError) -> Self {
        Self::error(id, err.to_rpc_error())
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional information about the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Create an error object
    pub fn new(code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }
}

/// A single line written to the output stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Response produced locally
    Local(Response),
    /// Remote response body, written exactly as received
    Relayed(Value),
}

impl Reply {
    /// Serialize into one newline-terminated output line.
    pub fn to_line(&self) -> BridgeResult<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }

    /// Error object of this reply, if it carries one.
    pub fn error(&self) -> Option<Value> {
        match self {
            Self::Local(response) => response
                .error
                .as_ref()
                .and_then(|e| serde_json::to_value(e).ok()),
            Self::Relayed(value) => value.get("error").cloned(),
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Local(response)
    }
}

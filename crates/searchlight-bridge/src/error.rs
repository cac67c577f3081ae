//! Bridge error types

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

use crate::protocol::{RpcError, INTERNAL_ERROR, INVALID_REQUEST, PARSE_ERROR};

/// Bridge error type
#[derive(Debug, Error)]
pub enum BridgeError {
    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame decoded as JSON but is not a usable JSON-RPC message
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No bearer token in the environment
    #[error("no API token configured: set MCP_TOKEN or SEARCHLIGHT_API_TOKEN")]
    MissingToken,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote server did not answer in time
    #[error("Remote request timed out after {}s", .0.as_secs())]
    UpstreamTimeout(Duration),

    /// Connection-level failure talking to the remote server
    #[error("Network error: {0}")]
    Network(String),

    /// Remote server answered with a non-success status
    #[error("Remote server returned HTTP {status}")]
    UpstreamStatus {
        /// HTTP status code
        status: u16,
        /// `message` field of the response body, if any
        message: Option<String>,
        /// Parsed body, or status and raw text when the body is not JSON
        body: Value,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Get the JSON-RPC error code for this error
    pub fn code(&self) -> i32 {
        match self {
            Self::Json(_) => PARSE_ERROR,
            Self::InvalidRequest(_) => INVALID_REQUEST,
            Self::MissingToken
            | Self::Config(_)
            | Self::UpstreamTimeout(_)
            | Self::Network(_)
            | Self::UpstreamStatus { .. }
            | Self::Internal(_)
            | Self::Io(_) => INTERNAL_ERROR,
        }
    }

    /// Build the JSON-RPC error object reported to the client
    pub fn to_rpc_error(&self) -> RpcError {
        let code = self.code();
        match self {
            Self::Json(e) => RpcError::new(code, "Parse error", Some(json!(e.to_string()))),
            Self::InvalidRequest(reason) => {
                RpcError::new(code, "Invalid Request", Some(json!(reason)))
            }
            Self::UpstreamTimeout(after) => RpcError::new(
                code,
                "Request timeout",
                Some(json!(format!(
                    "No response from remote server within {} seconds",
                    after.as_secs()
                ))),
            ),
            Self::Network(reason) => RpcError::new(code, "Network error", Some(json!(reason))),
            Self::UpstreamStatus {
                status,
                message,
                body,
            } => RpcError::new(
                code,
                message.clone().unwrap_or_else(|| format!("HTTP {status}")),
                Some(body.clone()),
            ),
            Self::Internal(reason) => RpcError::new(code, "Internal error", Some(json!(reason))),
            Self::MissingToken | Self::Config(_) | Self::Io(_) => {
                RpcError::new(code, "Internal error", Some(json!(self.to_string())))
            }
        }
    }
}

/// Bridge result type
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn parse_failure() -> BridgeError {
        serde_json::from_str::<Value>("{not json").expect_err("should fail").into()
    }

    #[test_case(parse_failure(), PARSE_ERROR ; "parse")]
    #[test_case(BridgeError::InvalidRequest("x".into()), INVALID_REQUEST ; "invalid request")]
    #[test_case(BridgeError::UpstreamTimeout(Duration::from_secs(30)), INTERNAL_ERROR ; "timeout")]
    #[test_case(BridgeError::Network("refused".into()), INTERNAL_ERROR ; "network")]
    #[test_case(BridgeError::Internal("boom".into()), INTERNAL_ERROR ; "internal")]
    #[test_case(BridgeError::MissingToken, INTERNAL_ERROR ; "missing token")]
    fn error_codes(err: BridgeError, expected: i32) {
        assert_eq!(err.code(), expected);
        assert_eq!(err.to_rpc_error().code, expected);
    }

    #[test]
    fn parse_error_carries_parser_message() {
        let err = parse_failure();
        let rpc = err.to_rpc_error();
        assert_eq!(rpc.message, "Parse error");
        let data = rpc.data.and_then(|d| d.as_str().map(str::to_owned));
        assert!(data.is_some_and(|d| d.contains("line 1")));
    }

    #[test]
    fn timeout_message_is_fixed() {
        let rpc = BridgeError::UpstreamTimeout(Duration::from_secs(30)).to_rpc_error();
        assert_eq!(rpc.message, "Request timeout");
        assert_eq!(
            rpc.data,
            Some(json!("No response from remote server within 30 seconds"))
        );
    }

    #[test]
    fn upstream_status_prefers_body_message() {
        let err = BridgeError::UpstreamStatus {
            status: 500,
            message: Some("boom".to_string()),
            body: json!({"message": "boom"}),
        };
        let rpc = err.to_rpc_error();
        assert_eq!(rpc.message, "boom");
        assert_eq!(rpc.data, Some(json!({"message": "boom"})));
    }

    #[test]
    fn upstream_status_falls_back_to_http_status() {
        let err = BridgeError::UpstreamStatus {
            status: 503,
            message: None,
            body: json!({"detail": "down"}),
        };
        assert_eq!(err.to_rpc_error().message, "HTTP 503");
        assert_eq!(err.to_string(), "Remote server returned HTTP 503");
    }

    #[test]
    fn network_error_display() {
        let err = BridgeError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: connection refused");
        assert_eq!(err.to_rpc_error().data, Some(json!("connection refused")));
    }
}

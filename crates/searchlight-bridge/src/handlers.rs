//! Message dispatch
//!
//! Answers the handful of methods the bridge owns and forwards everything else
//! to the remote endpoint.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::BridgeResult;
use crate::protocol::{
    Reply, Request, Response, INITIALIZE, MCP_PROTOCOL_VERSION, PROMPTS_LIST, RESOURCES_LIST,
};
use crate::upstream::UpstreamClient;

/// Server name reported by `initialize`.
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Server version reported by `initialize`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dispatch one decoded message.
///
/// Returns `None` for notifications, which never get a reply.
pub async fn dispatch(upstream: &UpstreamClient, message: Value) -> BridgeResult<Option<Reply>> {
    let request = Request::from_value(&message)?;
    let id = request.reply_id();

    info!(method = %request.method, id = %id, "received message");
    debug!(message = %message, "message payload");

    let reply = match request.method.as_str() {
        INITIALIZE => Response::success(id, initialize_result()).into(),
        _ if request.is_notification() => {
            info!(method = %request.method, "notification received, no reply");
            return Ok(None);
        }
        PROMPTS_LIST => Response::success(id, json!({ "prompts": [] })).into(),
        RESOURCES_LIST => Response::success(id, json!({ "resources": [] })).into(),
        _ => {
            info!(method = %request.method, url = %upstream.endpoint(), "forwarding to remote");
            upstream.forward(&message).await
        }
    };

    Ok(Some(reply))
}

/// Fixed `initialize` result; the client's requested version is not negotiated.
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiToken, BridgeConfig};
    use crate::error::BridgeError;
    use url::Url;

    /// Client pointed at a port nothing listens on; locally answered methods
    /// must never reach it.
    fn offline_upstream() -> UpstreamClient {
        let url = Url::parse("http://127.0.0.1:9/mcp").expect("url");
        UpstreamClient::new(&BridgeConfig::new(url, ApiToken::new("t"))).expect("client")
    }

    fn result_of(reply: Option<Reply>) -> (Value, Value) {
        match reply {
            Some(Reply::Local(Response {
                id,
                result: Some(result),
                error: None,
                ..
            })) => (id, result),
            other => panic!("expected local success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn initialize_is_answered_locally() {
        let message = json!({
            "jsonrpc": "2.0",
            "method": "initialize",
            "id": 0,
            "params": {"protocolVersion": "2099-01-01", "capabilities": {"sampling": {}}}
        });
        let reply = dispatch(&offline_upstream(), message).await.expect("dispatch");
        let (id, result) = result_of(reply);
        assert_eq!(id, json!(0));
        assert_eq!(result["protocolVersion"], json!("2024-11-05"));
        assert_eq!(result["capabilities"], json!({"tools": {}}));
        assert_eq!(result["serverInfo"]["name"], json!("searchlight-bridge"));
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let message = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let reply = dispatch(&offline_upstream(), message).await.expect("dispatch");
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn notification_with_id_still_gets_no_reply() {
        let message = json!({"jsonrpc": "2.0", "method": "notifications/cancelled", "id": 4});
        let reply = dispatch(&offline_upstream(), message).await.expect("dispatch");
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn prompts_list_is_empty() {
        let message = json!({"jsonrpc": "2.0", "method": "prompts/list", "id": "p"});
        let (id, result) = result_of(dispatch(&offline_upstream(), message).await.expect("dispatch"));
        assert_eq!(id, json!("p"));
        assert_eq!(result, json!({"prompts": []}));
    }

    #[tokio::test]
    async fn resources_list_is_empty() {
        let message = json!({"jsonrpc": "2.0", "method": "resources/list", "id": 2});
        let (_, result) = result_of(dispatch(&offline_upstream(), message).await.expect("dispatch"));
        assert_eq!(result, json!({"resources": []}));
    }

    #[tokio::test]
    async fn missing_method_is_rejected() {
        let err = dispatch(&offline_upstream(), json!({"jsonrpc": "2.0", "id": 1}))
            .await
            .expect_err("should fail");
        assert!(matches!(err, BridgeError::InvalidRequest(_)));
    }
}

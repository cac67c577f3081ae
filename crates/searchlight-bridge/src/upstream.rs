//! Remote forwarding over HTTP.
//!
//! Every forwarded message resolves to a [`Reply`]. Transport failures are
//! turned into JSON-RPC error responses for the message's id, so the local
//! conversation never stalls because the remote side misbehaved:
//!
//! | remote outcome                         | reply                              |
//! |----------------------------------------|------------------------------------|
//! | 2xx, JSON body                         | body relayed verbatim              |
//! | 2xx, non-JSON body                     | `-32700 Parse error`               |
//! | non-2xx, JSON body with `error`        | body relayed verbatim              |
//! | non-2xx, other body                    | `-32603`, body `message` or `HTTP <status>` |
//! | connection failure                     | `-32603 Network error`             |
//! | no response within the timeout         | `-32603 Request timeout`           |
//!
//! There is no retry: a forwarded call may have side effects on the remote.

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::{ApiToken, BridgeConfig};
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::{Reply, Response};

/// Client identifier sent with every request.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the remote JSON-RPC endpoint.
///
/// Cheap to clone; clones share reqwest's connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    endpoint: Url,
    token: ApiToken,
    timeout: Duration,
}

impl UpstreamClient {
    /// Build a client for the configured endpoint.
    pub fn new(config: &BridgeConfig) -> BridgeResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.server_url.clone(),
            token: config.token.clone(),
            timeout: config.request_timeout,
        })
    }

    /// Remote endpoint this client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Forward a decoded message and return the reply to write back.
    pub async fn forward(&self, message: &Value) -> Reply {
        let id = message.get("id").cloned().unwrap_or(Value::Null);
        match self.try_forward(message).await {
            Ok(body) => Reply::Relayed(body),
            Err(e) => {
                warn!(id = %id, error = %e, "remote call failed");
                Response::failure(id, &e).into()
            }
        }
    }

    async fn try_forward(&self, message: &Value) -> BridgeResult<Value> {
        let body = serde_json::to_vec(message)
            .map_err(|e| BridgeError::Internal(format!("failed to encode request: {e}")))?;

        debug!(url = %self.endpoint, bytes = body.len(), "posting to remote");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            // Explicit length is part of the request contract with the remote.
            .header(CONTENT_LENGTH, body.len().to_string())
            .bearer_auth(self.token.as_str())
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(&e))?;

        debug!(status = status.as_u16(), bytes = text.len(), "remote responded");

        interpret_response(status, &text)
    }

    fn classify(&self, err: &reqwest::Error) -> BridgeError {
        if err.is_timeout() {
            BridgeError::UpstreamTimeout(self.timeout)
        } else {
            BridgeError::Network(error_chain(err))
        }
    }
}

/// Turn a remote status and body into a relayable JSON-RPC value.
pub fn interpret_response(status: StatusCode, text: &str) -> BridgeResult<Value> {
    if status.is_success() {
        return serde_json::from_str(text).map_err(BridgeError::from);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(body) if body.get("error").is_some_and(|e| !e.is_null()) => Ok(body),
        Ok(body) => {
            let message = match body.get("message") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            };
            Err(BridgeError::UpstreamStatus {
                status: status.as_u16(),
                message,
                body,
            })
        }
        Err(_) => Err(BridgeError::UpstreamStatus {
            status: status.as_u16(),
            message: None,
            body: json!({ "status": status.as_u16(), "body": text }),
        }),
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

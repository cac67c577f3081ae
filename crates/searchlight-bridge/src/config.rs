//! Bridge configuration.
//!
//! Everything is resolved once at startup and never changes afterwards:
//! - Remote endpoint URL (`MCP_SERVER_URL`, then `SEARCHLIGHT_API_URL`)
//! - Bearer token (`MCP_TOKEN`, then `SEARCHLIGHT_API_TOKEN`)
//! - Request timeout and startup probe switch (CLI only)

use std::fmt;
use std::time::Duration;

use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{BridgeError, BridgeResult};

/// Endpoint used when neither URL variable is set.
pub const DEFAULT_SERVER_URL: &str = "https://api.searchlight.ai/mcp";

/// Token variables, in priority order.
pub const TOKEN_VARS: [&str; 2] = ["MCP_TOKEN", "SEARCHLIGHT_API_TOKEN"];

/// Endpoint variables, in priority order.
pub const SERVER_URL_VARS: [&str; 2] = ["MCP_SERVER_URL", "SEARCHLIGHT_API_URL"];

/// Default per-request timeout for remote calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bearer credential for the remote API, zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiToken {
    secret: String,
}

impl ApiToken {
    /// Wraps a raw token string.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.secret
    }

    /// Log-safe description of the token.
    pub fn masked(&self) -> String {
        format!("present ({} chars)", self.secret.chars().count())
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Process-wide bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Remote JSON-RPC endpoint.
    pub server_url: Url,
    /// Bearer token sent with every forwarded request.
    pub token: ApiToken,
    /// Upper bound for one remote round-trip.
    pub request_timeout: Duration,
    /// Whether to send the diagnostic ping at startup.
    pub startup_probe: bool,
}

impl BridgeConfig {
    /// Creates a configuration with default timeout and probe enabled.
    pub fn new(server_url: Url, token: ApiToken) -> Self {
        Self {
            server_url,
            token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            startup_probe: true,
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> BridgeResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// A variable that is set but empty counts as unset, so resolution falls
    /// through to the next name.
    pub fn from_lookup<F>(lookup: F) -> BridgeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = first_present(&lookup, &TOKEN_VARS)
            .map(ApiToken::new)
            .ok_or(BridgeError::MissingToken)?;

        let raw_url = first_present(&lookup, &SERVER_URL_VARS)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let server_url = parse_server_url(&raw_url)?;

        Ok(Self::new(server_url, token))
    }

    /// Replace the endpoint, e.g. from a command-line override.
    pub fn with_server_url(mut self, raw: &str) -> BridgeResult<Self> {
        self.server_url = parse_server_url(raw)?;
        Ok(self)
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable the startup probe.
    #[must_use]
    pub fn with_startup_probe(mut self, enabled: bool) -> Self {
        self.startup_probe = enabled;
        self
    }
}

fn first_present<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
}

/// Parse an endpoint URL; only `http` and `https` are accepted.
pub fn parse_server_url(raw: &str) -> BridgeResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| BridgeError::Config(format!("invalid server URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(BridgeError::Config(format!(
            "unsupported URL scheme '{other}' in '{raw}'"
        ))),
    }
}

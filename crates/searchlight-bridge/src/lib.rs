//! Searchlight Bridge
//!
//! Stdio JSON-RPC bridge for MCP clients. Messages read line by line from
//! stdin are either answered locally or POSTed to the Searchlight analytics
//! API, and the responses are written back to stdout one per line.
//!
//! ## Protocol
//!
//! Request:
//! ```json
//! {"jsonrpc": "2.0", "id": 1, "method": "tools/list"}
//! ```
//!
//! Response (relayed from the remote as-is):
//! ```json
//! {"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}
//! ```
//!
//! Error:
//! ```json
//! {"jsonrpc": "2.0", "id": 1, "error": {"code": -32603, "message": "Network error", "data": "..."}}
//! ```
//!
//! `initialize`, `prompts/list` and `resources/list` are answered locally;
//! `notifications/*` are logged and never answered.

pub mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod protocol;
pub mod upstream;

pub use bridge::Bridge;
pub use config::{ApiToken, BridgeConfig};
pub use error::{BridgeError, BridgeResult};
pub use frame::FrameBuffer;
pub use protocol::{Reply, Request, Response, RpcError};
pub use upstream::UpstreamClient;

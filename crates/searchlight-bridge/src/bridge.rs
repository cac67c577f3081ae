//! The bridge runtime.
//!
//! [`Bridge::run`] reads the input stream, splits it into frames and handles
//! each frame in its own task. A slow remote call therefore never holds up
//! later frames, and replies are written in completion order. One writer task
//! owns the output stream so every reply lands as a whole line.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::frame::FrameBuffer;
use crate::handlers;
use crate::protocol::{Reply, Response, JSONRPC_VERSION, PING};
use crate::upstream::UpstreamClient;

/// Size of a single read from the input stream.
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Id used by the startup connectivity probe.
pub const PROBE_ID: &str = "startup-ping";

/// Stdio-to-HTTP JSON-RPC bridge.
#[derive(Debug, Clone)]
pub struct Bridge {
    upstream: UpstreamClient,
}

impl Bridge {
    /// Create a bridge forwarding through the given client.
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    /// Remote client used for forwarding.
    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Handle one frame and produce the reply to write, if any.
    ///
    /// Never fails: anything that goes wrong becomes a JSON-RPC error reply
    /// for the frame's id (or `null` if the frame did not parse).
    pub async fn handle_frame(&self, frame: &str) -> Option<Reply> {
        let message: Value = match serde_json::from_str(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "discarding malformed frame");
                return Some(Response::failure(Value::Null, &BridgeError::Json(e)).into());
            }
        };

        let id = message.get("id").cloned().unwrap_or(Value::Null);

        match AssertUnwindSafe(handlers::dispatch(&self.upstream, message))
            .catch_unwind()
            .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(id = %id, error = %e, "failed to handle message");
                Some(Response::failure(id, &e).into())
            }
            Err(panic) => Some(panic_reply(id, panic.as_ref())),
        }
    }

    /// Pump frames from `input` to `output` until end of input.
    ///
    /// In-flight frames are allowed to finish before returning. A read error
    /// ends the input like EOF. A write error stops the run at once, even
    /// while input is still open, and is returned.
    pub async fn run<R, W>(&self, mut input: R, output: W) -> BridgeResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut writer = tokio::spawn(write_replies(output, rx));

        let mut frames = FrameBuffer::new();
        let mut in_flight = JoinSet::new();
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let read = tokio::select! {
                read = input.read(&mut chunk) => read,
                done = &mut writer => {
                    in_flight.abort_all();
                    return output_stopped(done);
                }
            };
            let n = match read {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    error!(error = %e, "input read error");
                    break;
                }
            };

            for frame in frames.feed(&chunk[..n]) {
                self.spawn_frame(&mut in_flight, frame, tx.clone());
            }

            while let Some(done) = in_flight.try_join_next() {
                log_join_error(done);
            }
        }

        if let Some(frame) = frames.finish() {
            self.spawn_frame(&mut in_flight, frame, tx.clone());
        }

        info!(pending = in_flight.len(), "input closed");

        loop {
            let done = tokio::select! {
                next = in_flight.join_next() => match next {
                    Some(done) => {
                        log_join_error(done);
                        continue;
                    }
                    None => break,
                },
                done = &mut writer => done,
            };
            in_flight.abort_all();
            return output_stopped(done);
        }

        drop(tx);
        writer
            .await
            .map_err(|e| BridgeError::Internal(format!("writer task failed: {e}")))?
    }

    fn spawn_frame(
        &self,
        in_flight: &mut JoinSet<()>,
        frame: String,
        tx: mpsc::UnboundedSender<Reply>,
    ) {
        let bridge = self.clone();
        in_flight.spawn(async move {
            if let Some(reply) = bridge.handle_frame(&frame).await {
                if tx.send(reply).is_err() {
                    warn!("output closed, dropping reply");
                }
            }
        });
    }

    /// Fire the diagnostic ping on a detached task.
    ///
    /// The outcome is only logged; nothing waits on the returned handle
    /// except tests.
    pub fn spawn_probe(&self) -> JoinHandle<()> {
        let upstream = self.upstream.clone();
        tokio::spawn(async move {
            let ping = json!({ "jsonrpc": JSONRPC_VERSION, "method": PING, "id": PROBE_ID });
            let reply = upstream.forward(&ping).await;
            match reply.error() {
                None => info!(url = %upstream.endpoint(), "startup ping succeeded"),
                Some(error) => {
                    warn!(url = %upstream.endpoint(), error = %error, "startup ping failed");
                }
            }
        })
    }
}

async fn write_replies<W>(mut output: W, mut rx: mpsc::UnboundedReceiver<Reply>) -> BridgeResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = rx.recv().await {
        let line = match reply.to_line() {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "failed to serialize reply");
                continue;
            }
        };
        output.write_all(&line).await?;
        output.flush().await?;
        debug!(bytes = line.len(), "reply written");
    }
    output.shutdown().await?;
    Ok(())
}

/// Outcome of a writer task that ended while replies could still arrive.
fn output_stopped(done: Result<BridgeResult<()>, JoinError>) -> BridgeResult<()> {
    let err = match done {
        Ok(Err(e)) => e,
        Ok(Ok(())) => BridgeError::Internal("output closed before input ended".to_string()),
        Err(e) => BridgeError::Internal(format!("writer task failed: {e}")),
    };
    error!(error = %err, "output failed, stopping");
    Err(err)
}

/// Error reply for a frame whose handler panicked.
fn panic_reply(id: Value, payload: &(dyn Any + Send)) -> Reply {
    let reason = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };
    error!(id = %id, reason = %reason, "message handler panicked");
    Response::failure(id, &BridgeError::Internal(reason)).into()
}

fn log_join_error(done: Result<(), JoinError>) {
    if let Err(e) = done {
        error!(error = %e, "frame task failed");
    }
}

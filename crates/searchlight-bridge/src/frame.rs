//! Newline-delimited frame assembly for the input stream.
//!
//! Reads arrive in arbitrary chunks. [`FrameBuffer`] accumulates raw bytes and
//! hands back every complete line, keeping the unterminated tail for the next
//! read. Splitting happens on bytes rather than text so a multi-byte UTF-8
//! character cut in half by a read boundary is reassembled before decoding.

/// Buffered line splitter that handles partial chunks
#[derive(Debug, Default)]
pub struct FrameBuffer {
    /// Bytes received since the last newline
    pending: Vec<u8>,
}

impl FrameBuffer {
    /// Create an empty frame buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and extract complete, non-blank frames
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);

        complete
            .split(|&b| b == b'\n')
            .filter_map(decode_frame)
            .collect()
    }

    /// Flush the remaining bytes at end of input
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_frame(&rest)
    }

    /// Number of bytes waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_frame(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    if text.trim().is_empty() {
        None
    } else {
        Some(text.into_owned())
    }
}

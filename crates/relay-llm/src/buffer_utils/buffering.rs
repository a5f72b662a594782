use anyhow::Result;
use std::collections::VecDeque;

/// Byte buffer that hands out complete lines as network chunks arrive
///
/// Chunks may split a line (or a multi-byte character) anywhere; bytes stay
/// buffered until the terminating `\n` shows up.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line without its `\n` / `\r\n` terminator.
    /// Returns None if no complete line is available.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(Self::decode(&line_bytes))
    }

    /// Drain whatever is left as a final unterminated line
    pub fn take_remaining(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let line_bytes: Vec<u8> = self.buffer.drain(..).collect();
        Some(Self::decode(&line_bytes))
    }

    fn decode(bytes: &[u8]) -> Result<String> {
        std::str::from_utf8(bytes)
            .map(|s| s.trim_end_matches(['\n', '\r']).to_string())
            .map_err(|e| anyhow::anyhow!("Invalid UTF-8: {}", e))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

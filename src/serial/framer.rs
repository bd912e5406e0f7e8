//! CRLF line framing for serial byte streams.

const TERMINATOR: &[u8] = b"\r\n";

/// Largest incomplete line kept between reads
pub const MAX_PENDING: usize = 4096;

/// Accumulates raw bytes and splits off complete `\r\n`-terminated lines.
///
/// Bytes are buffered undecoded so a terminator or a multi-byte character
/// split across two reads frames the same way as if it arrived in one read.
/// Each line is decoded lossily, trimmed, and dropped if empty. An
/// unterminated line longer than `MAX_PENDING` loses its oldest bytes.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self { buffer: Vec::with_capacity(256) }
    }

    /// Append `chunk` and return every line it completed, oldest first
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = find_terminator(&self.buffer[start..]) {
            let end = start + pos;
            let line = String::from_utf8_lossy(&self.buffer[start..end]);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
            start = end + TERMINATOR.len();
        }
        self.buffer.drain(..start);

        if self.buffer.len() > MAX_PENDING {
            let excess = self.buffer.len() - MAX_PENDING;
            log::warn!("No line terminator in {} bytes, dropping {} oldest", self.buffer.len(), excess);
            self.buffer.drain(..excess);
        }
        lines
    }

    /// Bytes of the incomplete trailing line
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

fn find_terminator(haystack: &[u8]) -> Option<usize> {
    haystack.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}

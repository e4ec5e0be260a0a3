//! Line framing for the chat event stream
//!
//! The remote API responds with a chunked body where each deliverable unit is
//! a line of the form `data: <json>`. Chunk boundaries are arbitrary: a line
//! may span chunks, and one chunk may carry several lines. The decoder
//! buffers bytes until a full line arrives and emits one raw record per
//! `data:` line; everything else is discarded silently.

const DATA_PREFIX: &str = "data:";

/// Incremental decoder turning byte chunks into raw `data:` records.
///
/// One instance per request; a new request gets a new decoder.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: Vec<u8>,
}

impl EventDecoder {
    /// Create a new decoder with an empty line buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning the records completed by it.
    ///
    /// Splitting only happens at `\n`, which never occurs inside a multi-byte
    /// UTF-8 sequence, so arbitrary chunk boundaries are safe.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            // drop the trailing `\n` (and a `\r` before it, if any)
            let line = String::from_utf8_lossy(&line[..pos]);
            if let Some(record) = extract_record(&line) {
                records.push(record);
            }
        }
        records
    }

    /// Signal end of stream, framing a final unterminated line if present.
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer);
        extract_record(&line)
    }
}

/// Frame one complete line: strip the `data:` prefix and surrounding
/// whitespace, or discard the line if it carries no record.
fn extract_record(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || !line.starts_with(DATA_PREFIX) {
        return None;
    }
    Some(line[DATA_PREFIX.len()..].trim().to_string())
}

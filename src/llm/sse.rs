//! Incremental decoder for `text/event-stream` bodies.
//!
//! Network chunks can split lines and even UTF-8 sequences; the decoder
//! buffers until a full line is available and yields the payload of every
//! `data:` line.

#[derive(Debug, Default)]
pub struct SseDecoder {
    bytes: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a network chunk, returning the data payloads it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(idx) = self.bytes.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.bytes.drain(..=idx).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing line that never got its newline
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.bytes);
        data_payload(&line).into_iter().collect()
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() || payload == "[DONE]" {
        None
    } else {
        Some(payload.to_string())
    }
}

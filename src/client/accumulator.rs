use super::decode::Utf8Decoder;

/// Reassembles one streamed reply from raw body chunks.
///
/// Chunks pass through the boundary-carry UTF-8 decoder, then through frame
/// reassembly: frames end at a blank line, each frame loses its `data: `
/// prefix (and, defensively, any embedded `data: ` occurrences), and the
/// payload is appended to a running buffer. Because frames are reassembled
/// before stripping, the result is independent of how the transport chunked
/// the bytes.
#[derive(Default)]
pub struct StreamAccumulator {
    decoder: Utf8Decoder,
    frame: String,
    buffer: String,
}

const FRAME_PREFIX: &str = "data: ";

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns the full running buffer.
    pub fn push(&mut self, bytes: &[u8]) -> &str {
        let text = self.decoder.push(bytes);
        self.frame.push_str(&text);

        while let Some(end) = self.frame.find("\n\n") {
            let payload = self.frame[..end].to_string();
            self.frame.drain(..end + 2);
            self.append_payload(&payload);
        }
        &self.buffer
    }

    /// Seal the reply at end of stream, flushing any unterminated frame.
    pub fn finish(mut self) -> String {
        let tail = self.decoder.finish();
        self.frame.push_str(&tail);
        if !self.frame.is_empty() {
            let tail = std::mem::take(&mut self.frame);
            self.append_payload(&tail);
        }
        self.buffer
    }

    pub fn message(&self) -> &str {
        &self.buffer
    }

    fn append_payload(&mut self, payload: &str) {
        let rest = payload.strip_prefix(FRAME_PREFIX).unwrap_or(payload);
        // Producers must not rely on `data: ` appearing inside fragment
        // text, so every occurrence is stripped.
        if rest.contains(FRAME_PREFIX) {
            self.buffer.push_str(&rest.replace(FRAME_PREFIX, ""));
        } else {
            self.buffer.push_str(rest);
        }
    }
}

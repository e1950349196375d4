//! Incremental server-sent-event decoding.
//!
//! Feed raw body bytes in whatever chunks the transport delivers; complete
//! `data:` payloads come out. Partial lines and partial events stay buffered
//! until the rest arrives, so chunk boundaries never corrupt a payload.

/// Streaming SSE decoder. One instance per response body.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a transport chunk, returning the payloads of every event
    /// completed by it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // trailing \n
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                // Blank line terminates the event.
                if !self.data_lines.is_empty() {
                    payloads.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
            } else if let Some(rest) = line.strip_prefix(b"data:") {
                let rest = rest.strip_prefix(b" ").unwrap_or(rest);
                self.data_lines
                    .push(String::from_utf8_lossy(rest).into_owned());
            }
            // Other fields (event:, id:, retry:, comments) are ignored.
        }

        payloads
    }

    /// Flush whatever is still buffered when the body ends without a final
    /// blank line.
    pub fn finish(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.buf);
        if let Some(rest) = tail.strip_prefix(b"data:") {
            let rest = rest.strip_prefix(b" ").unwrap_or(rest);
            self.data_lines
                .push(String::from_utf8_lossy(rest).into_owned());
        }
        if self.data_lines.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data_lines).join("\n"))
        }
    }
}

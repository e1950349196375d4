/// Incremental UTF-8 decoder that carries incomplete multi-byte sequences
/// across read boundaries. A stateless per-read decode would mangle any
/// non-ASCII character split between two network reads; this one holds the
/// trailing partial sequence until the rest arrives. Truly invalid bytes
/// become U+FFFD instead of aborting the stream.
#[derive(Default)]
pub struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (plus any carried prefix) as possible.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(s) => {
                    out.push_str(s);
                    self.carry.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.carry[..valid]));
                    match e.error_len() {
                        // Invalid sequence in the middle: replace and move on.
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + bad);
                        }
                        // Incomplete sequence at the end: keep it for the
                        // next read.
                        None => {
                            self.carry.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush at end of stream. A dangling partial sequence at EOF can never
    /// complete, so it decodes lossily.
    pub fn finish(&mut self) -> String {
        let tail = std::mem::take(&mut self.carry);
        String::from_utf8_lossy(&tail).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_straight_through() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.push(b"hello"), "hello");
        assert_eq!(dec.finish(), "");
    }

    #[test]
    fn multibyte_split_across_reads_is_carried() {
        let bytes = "héllo".as_bytes();
        // Split inside the two-byte 'é'.
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.push(&bytes[..2]), "h");
        assert_eq!(dec.push(&bytes[2..]), "éllo");
    }

    #[test]
    fn four_byte_char_split_three_ways() {
        let bytes = "a🦀b".as_bytes();
        let mut dec = Utf8Decoder::new();
        let mut out = String::new();
        out.push_str(&dec.push(&bytes[..2]));
        out.push_str(&dec.push(&bytes[2..4]));
        out.push_str(&dec.push(&bytes[4..]));
        out.push_str(&dec.finish());
        assert_eq!(out, "a🦀b");
    }

    #[test]
    fn every_split_point_reassembles_losslessly() {
        let text = "日本語 mixed with ASCII and émoji 🎉";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut dec = Utf8Decoder::new();
            let mut out = dec.push(&bytes[..split]);
            out.push_str(&dec.push(&bytes[split..]));
            out.push_str(&dec.finish());
            assert_eq!(out, text, "split at {split}");
        }
    }

    #[test]
    fn invalid_bytes_become_replacement_chars() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.push(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_tail_is_lossy_at_finish() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.push(&"é".as_bytes()[..1]), "");
        assert_eq!(dec.finish(), "\u{FFFD}");
    }
}

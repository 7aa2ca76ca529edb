//! Incremental UTF-8 decoding of stream frames.
//!
//! Frames have no boundary semantics, so a multibyte character can arrive
//! split across two of them. The decoder holds back an incomplete trailing
//! sequence until the bytes that finish it arrive.

/// Streaming UTF-8 decoder that never emits a partial character
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one frame, returning every complete character seen so far
    ///
    /// Invalid sequences become U+FFFD. An incomplete sequence at the end
    /// of the frame is retained for the next call.
    pub fn decode(&mut self, frame: &[u8]) -> String {
        self.pending.extend_from_slice(frame);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of stream; a dangling incomplete sequence becomes U+FFFD
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

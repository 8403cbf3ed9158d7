//! Streaming MD5 checksum used for ETag computation.
//!
//! The digest is fed in the same pass that persists the bytes, so the ETag
//! always describes exactly what landed on disk — it is never recomputed
//! from a separate re-read.

use md5::Context;

/// Incremental MD5 over a byte stream.
pub struct StreamingChecksum {
    digest: Context,
}

impl StreamingChecksum {
    pub fn new() -> Self {
        Self {
            digest: Context::new(),
        }
    }

    /// Feed one chunk of the stream.
    pub fn update(&mut self, chunk: &[u8]) {
        self.digest.consume(chunk);
    }

    /// Finish and return the lowercase hex digest.
    pub fn finalize(self) -> String {
        format!("{:x}", self.digest.compute())
    }
}

impl Default for StreamingChecksum {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot MD5 hex digest of a byte slice.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_well_known_digest() {
        assert_eq!(
            StreamingChecksum::new().finalize(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut streaming = StreamingChecksum::new();
        streaming.update(b"hello ");
        streaming.update(b"world");
        assert_eq!(streaming.finalize(), md5_hex(b"hello world"));
    }
}

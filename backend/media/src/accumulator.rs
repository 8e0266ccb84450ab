//! Bounded buffer for the bytes of a single multipart part.
//!
//! The ceiling is checked on every chunk, so peak memory is bounded by the
//! limit plus the one chunk that crossed it, regardless of upload size.

use bytes::{Bytes, BytesMut};
use pinforge_core::UploadError;

pub struct BoundedAccumulator {
    part: String,
    limit: u64,
    total: u64,
    buf: BytesMut,
    overflowed: bool,
}

impl BoundedAccumulator {
    pub fn new(part: impl Into<String>, limit: u64) -> Self {
        Self {
            part: part.into(),
            limit,
            total: 0,
            buf: BytesMut::new(),
            overflowed: false,
        }
    }

    /// Append one chunk. Fails with `Oversized` as soon as the running total
    /// passes the limit; the offending chunk is not retained and every later
    /// call fails the same way.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        if self.overflowed {
            return Err(self.oversized());
        }
        let total = self.total.saturating_add(chunk.len() as u64);
        if total > self.limit {
            self.overflowed = true;
            self.buf = BytesMut::new();
            return Err(self.oversized());
        }
        self.total = total;
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Complete the part and hand back its bytes.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    fn oversized(&self) -> UploadError {
        UploadError::Oversized {
            part: self.part.clone(),
            limit: self.limit,
        }
    }
}

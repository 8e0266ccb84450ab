use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::types::Cid;

/// A content-addressable storage backend.
///
/// Implementations are expected to be idempotent for identical bytes:
/// storing the same content twice yields the same CID.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Backend name (e.g., "web3", "kubo").
    fn name(&self) -> &str;

    /// Store `bytes` under `filename` with the given media type and return its CID.
    async fn put(&self, bytes: Bytes, filename: &str, media_type: &str) -> Result<Cid, StoreError>;
}

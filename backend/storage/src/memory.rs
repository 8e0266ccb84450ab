use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::debug;

use pinforge_core::{Cid, ContentStore, StoreError};

/// A successful `put` as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub cid: Cid,
    pub file_name: String,
    pub media_type: String,
    pub bytes: usize,
}

/// In-process content-addressed store.
///
/// CIDs are `bafk` + hex SHA-256 of the content, so identical bytes always map
/// to the same identifier. Records every successful call and can be told to
/// fail or stall, which makes it the store of choice for tests.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<Cid, Bytes>>,
    calls: Mutex<Vec<PutRecord>>,
    attempts: AtomicUsize,
    fail_on: Option<usize>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th `put` (1-based) fail with a rejection.
    pub fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Delay every `put` by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Content identifier for `bytes`.
    pub fn cid_for(bytes: &[u8]) -> Cid {
        Cid::new(format!("bafk{}", hex::encode(Sha256::digest(bytes))))
    }

    /// Number of `put` attempts, failed ones included.
    pub fn put_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<PutRecord> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn get(&self, cid: &Cid) -> Option<Bytes> {
        self.objects.lock().ok()?.get(cid).cloned()
    }

    /// Number of distinct objects stored.
    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, bytes: Bytes, filename: &str, media_type: &str) -> Result<Cid, StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_on == Some(attempt) {
            return Err(StoreError::Rejected {
                status: 503,
                body: format!("injected failure on call {attempt}"),
            });
        }

        let cid = Self::cid_for(&bytes);
        let record = PutRecord {
            cid: cid.clone(),
            file_name: filename.to_string(),
            media_type: media_type.to_string(),
            bytes: bytes.len(),
        };
        self.objects
            .lock()
            .map_err(|_| StoreError::Transport("memory store poisoned".to_string()))?
            .insert(cid.clone(), bytes);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(record);
        }

        debug!(cid = %cid, filename, "Stored object in memory");
        Ok(cid)
    }
}

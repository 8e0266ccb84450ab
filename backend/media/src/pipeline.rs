//! Upload orchestration: image first, then the metadata document that
//! points at it.
//!
//! The two `put` calls are strictly sequential. The metadata document is
//! only built from a CID the store actually returned, and nothing is rolled
//! back when the second upload fails: the store is content-addressed, so a
//! retried request re-uploads the same image to the same CID.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use pinforge_core::{
    Cid, ContentStore, MetadataDefaults, Part, Stage, StoreError, UploadError, UploadResult,
};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::metadata::{
    merge_metadata, parse_metadata, MetadataDocument, METADATA_FILE_NAME, METADATA_MEDIA_TYPE,
};
use crate::mime_detect::{is_image, resolve_media_type};

/// Field name of the binary part.
pub const FILE_FIELD: &str = "file";

/// Filename used when the binary part carries none.
pub const FALLBACK_FILE_NAME: &str = "upload.bin";

/// One overall time budget for a request, shared by every suspension point.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
            budget,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            at: None,
            budget: Duration::ZERO,
        }
    }

    /// Await `fut`, abandoning it with `Timeout { stage }` once the deadline passes.
    pub async fn run<F: Future>(&self, stage: Stage, fut: F) -> Result<F::Output, UploadError> {
        match self.at {
            None => Ok(fut.await),
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| UploadError::Timeout {
                    stage,
                    after: self.budget,
                }),
        }
    }
}

/// The parts of a request that drive orchestration.
#[derive(Debug)]
pub struct UploadRequest<'a> {
    pub binary: &'a Part,
    pub metadata: Option<&'a Part>,
}

impl<'a> UploadRequest<'a> {
    /// First part named `file` is the binary; first part whose filename is
    /// `metadata.json` is the sidecar.
    pub fn select(parts: &'a [Part]) -> Result<Self, UploadError> {
        let binary = parts
            .iter()
            .find(|p| p.field_name() == FILE_FIELD)
            .ok_or(UploadError::MissingFile)?;
        let metadata = parts
            .iter()
            .find(|p| p.file_name() == Some(METADATA_FILE_NAME));
        Ok(Self { binary, metadata })
    }
}

pub struct UploadPipeline {
    store: Arc<dyn ContentStore>,
    defaults: MetadataDefaults,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn ContentStore>, defaults: MetadataDefaults) -> Self {
        Self { store, defaults }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Upload the binary, merge its CID into the metadata, upload the metadata.
    #[instrument(skip_all, fields(store = self.store.name(), parts = parts.len()))]
    pub async fn process(
        &self,
        parts: &[Part],
        deadline: &Deadline,
    ) -> Result<UploadResult, UploadError> {
        let request = UploadRequest::select(parts)?;
        let image_cid = self.put_image(request.binary, deadline).await?;
        let document = self.build_metadata(request.metadata, &image_cid)?;
        let metadata_cid = self.put_metadata(&document, deadline).await?;
        Ok(UploadResult::new(image_cid, metadata_cid))
    }

    /// Store an already complete metadata document as-is.
    pub async fn publish_metadata(
        &self,
        document: &serde_json::Value,
        deadline: &Deadline,
    ) -> Result<Cid, UploadError> {
        self.put_metadata(document, deadline).await
    }

    async fn put_image(&self, part: &Part, deadline: &Deadline) -> Result<Cid, UploadError> {
        let file_name = part
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(FALLBACK_FILE_NAME);
        let media_type = resolve_media_type(part.media_type(), file_name);

        let cid = self
            .put(Stage::Image, part.payload().clone(), file_name, &media_type, deadline)
            .await?;
        info!(
            cid = %cid,
            bytes = part.byte_count(),
            file_name,
            media_type = %media_type,
            image = is_image(&media_type),
            "Image uploaded"
        );
        Ok(cid)
    }

    fn build_metadata(
        &self,
        part: Option<&Part>,
        image_cid: &Cid,
    ) -> Result<MetadataDocument, UploadError> {
        let supplied = match part {
            Some(part) => parse_metadata(part.payload()).inspect_err(|e| {
                warn!(error = %e, image_cid = %image_cid, "Rejecting metadata after image upload");
            })?,
            None => MetadataDocument::new(),
        };
        Ok(merge_metadata(supplied, &image_cid.ipfs_uri(), &self.defaults))
    }

    async fn put_metadata<T: Serialize + ?Sized>(
        &self,
        document: &T,
        deadline: &Deadline,
    ) -> Result<Cid, UploadError> {
        let body = serde_json::to_vec(document)
            .map_err(|e| UploadError::InvalidMetadataInput(e.to_string()))?;
        let cid = self
            .put(
                Stage::Metadata,
                Bytes::from(body),
                METADATA_FILE_NAME,
                METADATA_MEDIA_TYPE,
                deadline,
            )
            .await?;
        info!(cid = %cid, "Metadata uploaded");
        Ok(cid)
    }

    async fn put(
        &self,
        stage: Stage,
        bytes: Bytes,
        file_name: &str,
        media_type: &str,
        deadline: &Deadline,
    ) -> Result<Cid, UploadError> {
        deadline
            .run(stage, self.store.put(bytes, file_name, media_type))
            .await?
            .map_err(|source: StoreError| {
                warn!(stage = %stage, error = %source, "Storage upload failed");
                UploadError::UploadFailed { stage, source }
            })
    }
}

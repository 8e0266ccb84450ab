//! Streaming multipart ingestion and the two-phase upload pipeline.
//!
//! Request bodies are decoded by [`PartStream`] under a per-part byte
//! ceiling, then handed to [`UploadPipeline`], which stores the binary and
//! the metadata document that references it.

pub mod accumulator;
pub mod metadata;
pub mod mime_detect;
pub mod multipart;
pub mod pipeline;

pub use accumulator::BoundedAccumulator;
pub use metadata::{merge_metadata, parse_metadata, MetadataDocument, METADATA_FILE_NAME};
pub use mime_detect::{detect_mime_type, is_image, resolve_media_type};
pub use multipart::{DecodeLimits, PartStream, BODY_LABEL};
pub use pipeline::{Deadline, UploadPipeline, UploadRequest, FALLBACK_FILE_NAME, FILE_FIELD};

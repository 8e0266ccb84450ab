use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Pipeline stage a failure was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decode,
    Validate,
    Image,
    Metadata,
    Configuration,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Decode => "decode",
            Stage::Validate => "validate",
            Stage::Image => "image",
            Stage::Metadata => "metadata",
            Stage::Configuration => "configuration",
        };
        f.write_str(s)
    }
}

/// Externally observable outcome classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ClientInput,
    PayloadTooLarge,
    UpstreamDependency,
    Configuration,
}

impl ErrorKind {
    /// HTTP status carried by this outcome.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::ClientInput => 400,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::UpstreamDependency => 500,
            ErrorKind::Configuration => 500,
        }
    }
}

/// Errors raised by a content-addressable store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend rejected credentials: {0}")]
    Unauthorized(String),

    #[error("storage backend quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("storage backend returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("storage backend unreachable: {0}")]
    Transport(String),

    #[error("unexpected storage backend response: {0}")]
    InvalidResponse(String),
}

/// Every terminal failure of an upload request.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("malformed multipart body: {0}")]
    MalformedInput(String),

    #[error("part '{part}' exceeds the upload limit of {limit} bytes")]
    Oversized { part: String, limit: u64 },

    #[error("missing multipart file field 'file'")]
    MissingFile,

    #[error("metadata.json is not a valid JSON object: {0}")]
    InvalidMetadataInput(String),

    #[error("{stage} upload failed: {source}")]
    UploadFailed {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    #[error("{stage} stage timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("storage credential not configured: {0}")]
    MissingCredential(String),
}

impl UploadError {
    /// Classify into the outcome class surfaced to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::MalformedInput(_)
            | UploadError::MissingFile
            | UploadError::InvalidMetadataInput(_) => ErrorKind::ClientInput,
            UploadError::Oversized { .. } => ErrorKind::PayloadTooLarge,
            UploadError::UploadFailed { .. } | UploadError::Timeout { .. } => {
                ErrorKind::UpstreamDependency
            }
            UploadError::MissingCredential(_) => ErrorKind::Configuration,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            UploadError::MalformedInput(_) | UploadError::Oversized { .. } => Stage::Decode,
            UploadError::MissingFile => Stage::Validate,
            UploadError::InvalidMetadataInput(_) => Stage::Metadata,
            UploadError::UploadFailed { stage, .. } | UploadError::Timeout { stage, .. } => *stage,
            UploadError::MissingCredential(_) => Stage::Configuration,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

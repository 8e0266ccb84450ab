use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Media type assumed when a part declares none.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// URI scheme used for every content address handed back to callers.
pub const IPFS_SCHEME: &str = "ipfs://";

/// A content identifier returned by a content-addressable store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical `ipfs://<cid>` address.
    pub fn ipfs_uri(&self) -> String {
        format!("{IPFS_SCHEME}{}", self.0)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fully decoded multipart segment.
///
/// Parts are immutable once accumulated: the payload is a frozen `Bytes`
/// and `byte_count` is always derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    field_name: String,
    file_name: Option<String>,
    media_type: String,
    payload: Bytes,
}

impl Part {
    pub fn new(
        field_name: impl Into<String>,
        file_name: Option<String>,
        media_type: Option<String>,
        payload: Bytes,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name,
            media_type: media_type.unwrap_or_else(|| OCTET_STREAM.to_string()),
            payload,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Declared media type, or `application/octet-stream` when none was sent.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn byte_count(&self) -> usize {
        self.payload.len()
    }

    /// Plain form fields carry no filename.
    pub fn is_field(&self) -> bool {
        self.file_name.is_none()
    }

    /// Value of a plain form field, when it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Fallback `name` / `description` written into metadata documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDefaults {
    pub name: String,
    pub description: String,
}

/// Outcome of a fully successful upload: both documents are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub image_cid: Cid,
    pub image_url: String,
    pub metadata_cid: Cid,
    pub metadata_url: String,
}

impl UploadResult {
    pub fn new(image_cid: Cid, metadata_cid: Cid) -> Self {
        Self {
            image_url: image_cid.ipfs_uri(),
            metadata_url: metadata_cid.ipfs_uri(),
            image_cid,
            metadata_cid,
        }
    }
}

//! pinforge runtime configuration schema.
//!
//! Every field is optional on disk; [`crate::defaults`] fills the gaps and the
//! accessors on [`PinforgeConfig`] fall back to the same constants.

use pinforge_core::MetadataDefaults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::defaults::{
    BODY_FRAMING_BYTES, DEFAULT_BIND, DEFAULT_DESCRIPTION, DEFAULT_KUBO_ENDPOINT,
    DEFAULT_LOG_LEVEL, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_NAME, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WEB3_ENDPOINT,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinforgeConfig {
    /// HTTP listener
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Size ceiling and request time budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadConfig>,

    /// Defaults merged into metadata documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataConfig>,

    /// Content-addressable storage backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    /// Maximum bytes accepted for any single multipart part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
    /// Maximum bytes accepted for a whole request body, all parts included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_description: Option<String>,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// web3.storage HTTP upload API
    #[default]
    Web3,
    /// A Kubo (go-ipfs) node's RPC API
    Kubo,
    /// In-process store, for local development
    Memory,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Web3 => "web3",
            StorageBackend::Kubo => "kubo",
            StorageBackend::Memory => "memory",
        }
    }

    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            StorageBackend::Web3 => Some(DEFAULT_WEB3_ENDPOINT),
            StorageBackend::Kubo => Some(DEFAULT_KUBO_ENDPOINT),
            StorageBackend::Memory => None,
        }
    }

    /// Whether the backend refuses to work without a credential.
    pub fn requires_token(self) -> bool {
        matches!(self, StorageBackend::Web3)
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web3" | "web3storage" | "web3.storage" => Ok(StorageBackend::Web3),
            "kubo" | "ipfs" => Ok(StorageBackend::Kubo),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<StorageBackend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bearer credential; usually `${WEB3STORAGE_TOKEN}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl StorageConfig {
    pub fn backend(&self) -> StorageBackend {
        self.backend.unwrap_or_default()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .or_else(|| self.backend().default_endpoint())
    }

    /// Non-empty credential, if configured.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling JSON log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

impl PinforgeConfig {
    pub fn bind_address(&self) -> String {
        let server = self.server.as_ref();
        let bind = server
            .and_then(|s| s.bind.as_deref())
            .unwrap_or(DEFAULT_BIND);
        let port = server.and_then(|s| s.port).unwrap_or(DEFAULT_PORT);
        format!("{bind}:{port}")
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.upload
            .as_ref()
            .and_then(|u| u.max_bytes)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Whole-body ceiling. Unless configured, room for two parts at the
    /// per-part ceiling plus framing.
    pub fn max_body_bytes(&self) -> u64 {
        self.upload
            .as_ref()
            .and_then(|u| u.max_body_bytes)
            .unwrap_or_else(|| {
                self.max_upload_bytes()
                    .saturating_mul(2)
                    .saturating_add(BODY_FRAMING_BYTES)
            })
    }

    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .upload
            .as_ref()
            .and_then(|u| u.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn metadata_defaults(&self) -> MetadataDefaults {
        let metadata = self.metadata.as_ref();
        MetadataDefaults {
            name: metadata
                .and_then(|m| m.default_name.clone())
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            description: metadata
                .and_then(|m| m.default_description.clone())
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        }
    }

    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.dir.as_deref())
    }
}

//! Content-addressable storage backends.
//!
//! Every backend implements [`pinforge_core::ContentStore`]; the upload
//! pipeline only ever sees that trait.

pub mod kubo;
pub mod memory;
pub mod web3;

pub use kubo::IpfsNodeClient;
pub use memory::{MemoryStore, PutRecord};
pub use web3::Web3StorageClient;

use std::sync::Arc;

use pinforge_config::{StorageBackend, StorageConfig};
use pinforge_core::{ContentStore, StoreError, UploadError};
use pinforge_logging::redact_sensitive_data;
use reqwest::StatusCode;
use tracing::info;

/// Name of the credential surfaced in configuration errors.
pub const CREDENTIAL_NAME: &str = "WEB3STORAGE_TOKEN";

/// Build the configured backend.
///
/// The web3 backend without a credential yields `MissingCredential`.
pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn ContentStore>, UploadError> {
    let backend = config.backend();
    let store: Arc<dyn ContentStore> = match backend {
        StorageBackend::Web3 => {
            let token = config
                .token()
                .ok_or_else(|| UploadError::MissingCredential(CREDENTIAL_NAME.to_string()))?;
            let mut client = Web3StorageClient::new(token);
            if let Some(endpoint) = config.endpoint() {
                client = client.with_base_url(endpoint);
            }
            Arc::new(client)
        }
        StorageBackend::Kubo => {
            let endpoint = config.endpoint().unwrap_or_default();
            Arc::new(IpfsNodeClient::new(endpoint).with_token(config.token()))
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    info!(backend = %backend, endpoint = ?config.endpoint(), "Storage backend ready");
    Ok(store)
}

/// Map a non-success HTTP status to a store error, scrubbing credentials
/// the backend may have echoed back.
pub(crate) fn error_for_status(status: StatusCode, body: String) -> StoreError {
    let body = redact_sensitive_data(&body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(body),
        StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS => {
            StoreError::QuotaExceeded(body)
        }
        _ => StoreError::Rejected {
            status: status.as_u16(),
            body,
        },
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Transport(redact_sensitive_data(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web3_without_token_is_misconfigured() {
        let err = build_store(&StorageConfig::default()).err().unwrap();
        assert!(matches!(err, UploadError::MissingCredential(ref name) if name == CREDENTIAL_NAME));
    }

    #[test]
    fn builds_each_backend() {
        let web3 = StorageConfig {
            token: Some("tok".into()),
            ..Default::default()
        };
        assert_eq!(build_store(&web3).unwrap().name(), "web3");

        let kubo = StorageConfig {
            backend: Some(StorageBackend::Kubo),
            ..Default::default()
        };
        assert_eq!(build_store(&kubo).unwrap().name(), "kubo");

        let memory = StorageConfig {
            backend: Some(StorageBackend::Memory),
            ..Default::default()
        };
        assert_eq!(build_store(&memory).unwrap().name(), "memory");
    }

    #[test]
    fn status_mapping_distinguishes_auth_and_quota() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, "bad token".into()),
            StoreError::Unauthorized(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            StoreError::QuotaExceeded(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, "upstream".into()),
            StoreError::Rejected { status: 502, .. }
        ));
    }

    #[test]
    fn error_bodies_are_redacted() {
        let err = error_for_status(StatusCode::FORBIDDEN, "Bearer abc123 rejected".into());
        assert!(!err.to_string().contains("abc123"));
    }
}

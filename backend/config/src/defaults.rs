//! Config defaults: fills every unset field of a freshly loaded config.

use crate::schema::{
    LoggingConfig, MetadataConfig, PinforgeConfig, ServerConfig, StorageConfig, UploadConfig,
};

pub const DEFAULT_BIND: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 3000;

/// Per-part size ceiling: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Allowance for multipart boundaries, headers and small text fields.
pub const BODY_FRAMING_BYTES: u64 = 64 * 1024;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_NAME: &str = "Untitled";

pub const DEFAULT_DESCRIPTION: &str = "Uploaded via pinforge";

pub const DEFAULT_WEB3_ENDPOINT: &str = "https://api.web3.storage";

pub const DEFAULT_KUBO_ENDPOINT: &str = "http://127.0.0.1:5001";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: PinforgeConfig) -> PinforgeConfig {
    let config = apply_server_defaults(config);
    let config = apply_upload_defaults(config);
    let config = apply_metadata_defaults(config);
    let config = apply_storage_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: PinforgeConfig) -> PinforgeConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    server.port.get_or_insert(DEFAULT_PORT);
    config
}

fn apply_upload_defaults(mut config: PinforgeConfig) -> PinforgeConfig {
    let upload = config.upload.get_or_insert_with(UploadConfig::default);
    upload.max_bytes.get_or_insert(DEFAULT_MAX_UPLOAD_BYTES);
    upload
        .request_timeout_secs
        .get_or_insert(DEFAULT_REQUEST_TIMEOUT_SECS);
    config
}

/// Empty strings are treated as unset so documents never get a blank default.
fn apply_metadata_defaults(mut config: PinforgeConfig) -> PinforgeConfig {
    let metadata = config.metadata.get_or_insert_with(MetadataConfig::default);
    if metadata.default_name.as_deref().is_none_or(str::is_empty) {
        metadata.default_name = Some(DEFAULT_NAME.to_string());
    }
    if metadata.default_description.as_deref().is_none_or(str::is_empty) {
        metadata.default_description = Some(DEFAULT_DESCRIPTION.to_string());
    }
    config
}

/// Backend defaults to web3; endpoint to the backend's public default.
fn apply_storage_defaults(mut config: PinforgeConfig) -> PinforgeConfig {
    let storage = config.storage.get_or_insert_with(StorageConfig::default);
    let backend = *storage.backend.get_or_insert_with(Default::default);
    if storage.endpoint.is_none() {
        storage.endpoint = backend.default_endpoint().map(str::to_string);
    }
    config
}

fn apply_logging_defaults(mut config: PinforgeConfig) -> PinforgeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StorageBackend;

    #[test]
    fn fills_empty_config() {
        let cfg = apply_all_defaults(PinforgeConfig::default());
        assert_eq!(cfg.upload.as_ref().unwrap().max_bytes, Some(DEFAULT_MAX_UPLOAD_BYTES));
        assert_eq!(cfg.server.as_ref().unwrap().port, Some(DEFAULT_PORT));
        assert_eq!(cfg.storage.as_ref().unwrap().backend, Some(StorageBackend::Web3));
        assert_eq!(
            cfg.storage.as_ref().unwrap().endpoint.as_deref(),
            Some(DEFAULT_WEB3_ENDPOINT)
        );
        assert_eq!(cfg.metadata_defaults().name, DEFAULT_NAME);
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = PinforgeConfig::default();
        cfg.upload = Some(UploadConfig {
            max_bytes: Some(512),
            ..Default::default()
        });
        cfg.storage = Some(StorageConfig {
            backend: Some(StorageBackend::Kubo),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.max_upload_bytes(), 512);
        assert_eq!(
            cfg.storage.unwrap().endpoint.as_deref(),
            Some(DEFAULT_KUBO_ENDPOINT)
        );
    }

    #[test]
    fn blank_default_name_is_replaced() {
        let mut cfg = PinforgeConfig::default();
        cfg.metadata = Some(MetadataConfig {
            default_name: Some(String::new()),
            default_description: Some("Mine".into()),
        });
        let cfg = apply_all_defaults(cfg);
        let defaults = cfg.metadata_defaults();
        assert_eq!(defaults.name, DEFAULT_NAME);
        assert_eq!(defaults.description, "Mine");
    }
}

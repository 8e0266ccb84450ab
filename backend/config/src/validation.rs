//! Config validation: checks run once at load time.

use crate::schema::PinforgeConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &PinforgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_upload(config, &mut report);
    validate_storage(config, &mut report);
    report
}

fn validate_server(config: &PinforgeConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    if server.port == Some(0) {
        report.error("server.port", "port must be > 0");
    }
    if server.bind.as_deref().is_some_and(|b| b.trim().is_empty()) {
        report.error("server.bind", "bind address cannot be empty");
    }
}

fn validate_upload(config: &PinforgeConfig, report: &mut ValidationReport) {
    let Some(upload) = &config.upload else { return };
    if upload.max_bytes == Some(0) {
        report.error("upload.maxBytes", "size ceiling must be > 0");
    }
    match upload.max_body_bytes {
        Some(0) => report.error("upload.maxBodyBytes", "body ceiling must be > 0"),
        Some(body) if body < config.max_upload_bytes() => report.warn(
            "upload.maxBodyBytes",
            "body ceiling is below the per-part ceiling; large parts will be rejected early",
        ),
        _ => {}
    }
    if upload.request_timeout_secs == Some(0) {
        report.error("upload.requestTimeoutSecs", "request timeout must be > 0");
    }
}

/// A missing credential is only a warning here: the server still starts and
/// answers every upload with a configuration error until it is fixed.
fn validate_storage(config: &PinforgeConfig, report: &mut ValidationReport) {
    let storage = config.storage();
    let backend = storage.backend();
    if backend.requires_token() && storage.token().is_none() {
        report.warn(
            "storage.token",
            format!("backend '{backend}' has no credential; uploads will fail"),
        );
    }
    match storage.endpoint() {
        Some(endpoint) if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") => {
            report.error("storage.endpoint", format!("'{endpoint}' is not an http(s) URL"));
        }
        _ => {}
    }
}

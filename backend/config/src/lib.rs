//! `pinforge-config`: runtime configuration for the pinforge upload service.
//!
//! Provides:
//! - Typed config schema (server, upload ceiling, metadata defaults, storage)
//! - YAML loading from the config directory
//! - `${ENV_VAR}` substitution and `PINFORGE_*` overrides
//! - Default value application
//! - Validation and redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, process_env, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, parse_config};
pub use redact::{redact, redacted_config};
pub use schema::{PinforgeConfig, StorageBackend, StorageConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load, substitute env vars, apply overrides and defaults, and validate.
///
/// This is the main entry point for loading a config at startup.
pub async fn load_and_prepare(path: &Path) -> Result<PinforgeConfig> {
    let raw_config = load_config(path).await?;
    prepare(raw_config, &process_env())
}

/// Run the post-load pipeline against an explicit environment.
pub fn prepare(
    raw_config: PinforgeConfig,
    env: &HashMap<String, String>,
) -> Result<PinforgeConfig> {
    let config = resolve(raw_config, env)?;

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!("config has {} validation error(s)", report.errors.len());
    }

    Ok(config)
}

/// Substitute env vars, apply overrides and defaults. Does not validate.
pub fn resolve(
    raw_config: PinforgeConfig,
    env: &HashMap<String, String>,
) -> Result<PinforgeConfig> {
    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: PinforgeConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config, env)?;
    Ok(apply_all_defaults(config))
}

//! Environment handling for config values.
//!
//! Two mechanisms, applied in this order:
//! - `${VAR_NAME}` references inside string values of the config file are
//!   substituted (`$${VAR}` escapes to a literal `${VAR}`).
//! - Well-known `PINFORGE_*` / `WEB3STORAGE_TOKEN` variables override the
//!   corresponding fields.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` variable names are matched.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{
    MetadataConfig, PinforgeConfig, ServerConfig, StorageBackend, StorageConfig, UploadConfig,
};

/// Matches `${VAR}` and the escaped form `$${VAR}` (group 1 set).
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\$)?\{([A-Z_][A-Z0-9_]*)\}").unwrap());

pub const ENV_BIND: &str = "PINFORGE_BIND";
pub const ENV_PORT: &str = "PINFORGE_PORT";
pub const ENV_MAX_UPLOAD_BYTES: &str = "PINFORGE_MAX_UPLOAD_BYTES";
pub const ENV_MAX_BODY_BYTES: &str = "PINFORGE_MAX_BODY_BYTES";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "PINFORGE_REQUEST_TIMEOUT_SECS";
pub const ENV_STORAGE_BACKEND: &str = "PINFORGE_STORAGE_BACKEND";
pub const ENV_STORAGE_ENDPOINT: &str = "PINFORGE_STORAGE_ENDPOINT";
pub const ENV_STORAGE_TOKEN: &str = "WEB3STORAGE_TOKEN";
pub const ENV_DEFAULT_NAME: &str = "PINFORGE_DEFAULT_NAME";
pub const ENV_DEFAULT_DESCRIPTION: &str = "PINFORGE_DEFAULT_DESCRIPTION";

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Snapshot of the process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Substitute `${VAR}` references in a config JSON value tree.
///
/// Returns an error if any referenced env var is not set or is empty.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let var_name = &caps[2];
        if caps.get(1).is_some() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Apply well-known environment variables on top of the file config.
pub fn apply_env_overrides(
    mut config: PinforgeConfig,
    env: &HashMap<String, String>,
) -> Result<PinforgeConfig> {
    let get = |key: &str| lookup(env, key);

    if let Some(bind) = get(ENV_BIND) {
        config.server.get_or_insert_with(ServerConfig::default).bind = Some(bind.to_string());
    }
    if let Some(port) = get(ENV_PORT) {
        let port = port
            .parse::<u16>()
            .with_context(|| format!("{ENV_PORT} must be a port number, got '{port}'"))?;
        config.server.get_or_insert_with(ServerConfig::default).port = Some(port);
    }
    if let Some(max) = get(ENV_MAX_UPLOAD_BYTES) {
        let max = max
            .parse::<u64>()
            .with_context(|| format!("{ENV_MAX_UPLOAD_BYTES} must be a byte count, got '{max}'"))?;
        config.upload.get_or_insert_with(UploadConfig::default).max_bytes = Some(max);
    }
    if let Some(max) = get(ENV_MAX_BODY_BYTES) {
        let max = max
            .parse::<u64>()
            .with_context(|| format!("{ENV_MAX_BODY_BYTES} must be a byte count, got '{max}'"))?;
        config.upload.get_or_insert_with(UploadConfig::default).max_body_bytes = Some(max);
    }
    if let Some(secs) = get(ENV_REQUEST_TIMEOUT_SECS) {
        let secs = secs.parse::<u64>().with_context(|| {
            format!("{ENV_REQUEST_TIMEOUT_SECS} must be whole seconds, got '{secs}'")
        })?;
        config
            .upload
            .get_or_insert_with(UploadConfig::default)
            .request_timeout_secs = Some(secs);
    }
    if let Some(backend) = get(ENV_STORAGE_BACKEND) {
        let backend = backend
            .parse::<StorageBackend>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid {ENV_STORAGE_BACKEND}"))?;
        config.storage.get_or_insert_with(StorageConfig::default).backend = Some(backend);
    }
    if let Some(endpoint) = get(ENV_STORAGE_ENDPOINT) {
        config.storage.get_or_insert_with(StorageConfig::default).endpoint =
            Some(endpoint.to_string());
    }
    if let Some(token) = get(ENV_STORAGE_TOKEN) {
        config.storage.get_or_insert_with(StorageConfig::default).token = Some(token.to_string());
    }
    if let Some(name) = get(ENV_DEFAULT_NAME) {
        config
            .metadata
            .get_or_insert_with(MetadataConfig::default)
            .default_name = Some(name.to_string());
    }
    if let Some(description) = get(ENV_DEFAULT_DESCRIPTION) {
        config
            .metadata
            .get_or_insert_with(MetadataConfig::default)
            .default_description = Some(description.to_string());
    }

    Ok(config)
}

fn lookup<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

//! Config redaction: produce safe-to-display config snapshots by masking
//! credentials.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::schema::PinforgeConfig;

static SENSITIVE_KEYS: &[&str] = &[
    "token",
    "apiKey",
    "api_key",
    "accessToken",
    "access_token",
    "secret",
    "password",
    "authorization",
];

/// Redact a config JSON value, replacing credential fields with a short hint.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

/// Serialize a config and redact it in one step.
pub fn redacted_config(config: &PinforgeConfig) -> Result<Value> {
    let value = serde_json::to_value(config).context("Failed to serialize config for display")?;
    Ok(redact(&value))
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if !is_sensitive_key(key) || s.is_empty() {
        return Value::String(s.to_string());
    }
    // Keep a 4-char hint so operators can tell credentials apart.
    let hint = if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    };
    Value::String(hint)
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}

//! `pinforge check-config`: print the effective configuration with
//! credentials masked, then the validation report.

use std::path::Path;

use anyhow::{bail, Result};
use pinforge_config::{load_config, process_env, redacted_config, resolve, validate};

pub async fn run(path: &Path) -> Result<()> {
    let config = resolve(load_config(path).await?, &process_env())?;

    println!("Config file: {}", path.display());
    println!("{}", serde_json::to_string_pretty(&redacted_config(&config)?)?);

    let report = validate(&config);
    for warning in &report.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !report.is_valid() {
        bail!("config has {} validation error(s)", report.errors.len());
    }
    println!("Config OK");
    Ok(())
}

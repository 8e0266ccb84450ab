//! `pinforge status`: query the health endpoint of a running gateway.

use anyhow::Result;
use pinforge_config::PinforgeConfig;

pub async fn run(config: &PinforgeConfig) -> Result<()> {
    let port = config
        .server
        .as_ref()
        .and_then(|s| s.port)
        .unwrap_or(pinforge_config::defaults::DEFAULT_PORT);
    let url = format!("http://localhost:{port}/api/health");

    println!("pinforge status: checking {url}...");
    match reqwest::Client::new().get(&url).send().await {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => {
            println!("pinforge is not running on port {port}");
        }
    }
    Ok(())
}

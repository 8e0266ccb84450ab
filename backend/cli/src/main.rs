mod check_config_cmd;
mod status_cmd;

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pinforge_config::{config_dir, config_file_path, load_and_prepare, validate, PinforgeConfig};
use pinforge_gateway::{build_router, start_server, GatewayState};
use pinforge_logging::init_logger;

#[derive(Parser)]
#[command(name = "pinforge")]
#[command(about = "pinforge - streaming IPFS upload gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the upload gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Query a running gateway's health endpoint
    Status,
    /// Load, validate and print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = config_file_path(&config_dir());

    match cli.command {
        Commands::Serve { port, bind } => {
            let mut config = load_and_prepare(&path).await?;
            let server = config.server.get_or_insert_with(Default::default);
            if port.is_some() {
                server.port = port;
            }
            if bind.is_some() {
                server.bind = bind;
            }
            run_server(config).await?;
        }
        Commands::Status => {
            let config = load_and_prepare(&path).await?;
            status_cmd::run(&config).await?;
        }
        Commands::CheckConfig => check_config_cmd::run(&path).await?,
    }

    Ok(())
}

async fn run_server(config: PinforgeConfig) -> Result<()> {
    init_logger(config.log_dir().map(Path::new), config.log_level());

    // Validation already passed; repeat the warnings now that logging is up.
    for warning in validate(&config).warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }

    let storage = config.storage();
    info!(
        addr = %config.bind_address(),
        backend = %storage.backend(),
        max_upload_bytes = config.max_upload_bytes(),
        timeout_secs = config.request_timeout().as_secs(),
        "Starting pinforge gateway"
    );

    let state = GatewayState::from_config(&config);
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address()))?;
    start_server(addr, app).await
}

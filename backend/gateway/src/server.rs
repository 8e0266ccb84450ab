//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use pinforge_config::PinforgeConfig;
use pinforge_core::{ContentStore, MetadataDefaults, UploadError};
use pinforge_media::{DecodeLimits, Deadline, UploadPipeline};
use pinforge_storage::{build_store, CREDENTIAL_NAME};

use crate::{health_api, metadata_api, upload_api};

/// Per-request limits and metadata defaults.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_upload_bytes: u64,
    pub max_body_bytes: u64,
    pub request_timeout: Duration,
    pub defaults: MetadataDefaults,
}

impl UploadSettings {
    pub fn from_config(config: &PinforgeConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes(),
            max_body_bytes: config.max_body_bytes(),
            request_timeout: config.request_timeout(),
            defaults: config.metadata_defaults(),
        }
    }
}

/// Application state shared across routes.
///
/// `pipeline` is `None` when the storage backend could not be built for lack
/// of a credential; every upload then fails the same way until it is fixed.
#[derive(Clone)]
pub struct GatewayState {
    pipeline: Option<Arc<UploadPipeline>>,
    backend: String,
    settings: Arc<UploadSettings>,
    started_at: Instant,
}

impl GatewayState {
    pub fn new(
        store: Option<Arc<dyn ContentStore>>,
        backend: impl Into<String>,
        settings: UploadSettings,
    ) -> Self {
        let pipeline =
            store.map(|store| Arc::new(UploadPipeline::new(store, settings.defaults.clone())));
        Self {
            pipeline,
            backend: backend.into(),
            settings: Arc::new(settings),
            started_at: Instant::now(),
        }
    }

    /// Build the configured store and wrap it. A missing credential is
    /// logged here and reported per request.
    pub fn from_config(config: &PinforgeConfig) -> Self {
        let storage = config.storage();
        let store = match build_store(&storage) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(
                    error = %e,
                    backend = %storage.backend(),
                    "Uploads disabled until the storage credential is set"
                );
                None
            }
        };
        Self::new(store, storage.backend().as_str(), UploadSettings::from_config(config))
    }

    pub(crate) fn pipeline(&self) -> Result<&UploadPipeline, UploadError> {
        self.pipeline
            .as_deref()
            .ok_or_else(|| UploadError::MissingCredential(CREDENTIAL_NAME.to_string()))
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.pipeline.is_some()
    }

    pub(crate) fn backend(&self) -> &str {
        &self.backend
    }

    pub(crate) fn max_upload_bytes(&self) -> u64 {
        self.settings.max_upload_bytes
    }

    /// Ceilings for decoding one multipart body.
    pub(crate) fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits::per_part(self.settings.max_upload_bytes)
            .with_body(self.settings.max_body_bytes)
    }

    /// A fresh deadline for one request.
    pub(crate) fn deadline(&self) -> Deadline {
        Deadline::after(self.settings.request_timeout)
    }

    pub(crate) fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Build the gateway router. Body size is enforced by the upload handlers,
/// so axum's default limit is disabled.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/api/upload",
            post(upload_api::upload)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/upload-metadata",
            post(metadata_api::upload_metadata)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route("/api/health", get(health_api::get_health))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST, OPTIONS")],
        Json(json!({ "ok": false, "error": "Only POST allowed" })),
    )
        .into_response()
}

/// Serve `app` on `addr` until Ctrl-C.
#[instrument(skip(app))]
pub async fn start_server(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

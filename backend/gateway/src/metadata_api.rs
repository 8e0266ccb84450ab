//! `POST /api/upload-metadata`: publish a ready-made metadata document.

use axum::{body::Body, extract::State, Json};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use pinforge_core::{Cid, Stage, UploadError};
use pinforge_media::{parse_metadata, BoundedAccumulator, METADATA_FILE_NAME};

use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub ok: bool,
    pub metadata_cid: Cid,
    #[serde(rename = "tokenURI")]
    pub token_uri: String,
}

/// Handler for `POST /api/upload-metadata`
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn upload_metadata(
    State(state): State<GatewayState>,
    body: Body,
) -> Result<Json<MetadataResponse>, ApiError> {
    let pipeline = state.pipeline()?;
    let deadline = state.deadline();

    let mut buffer = BoundedAccumulator::new(METADATA_FILE_NAME, state.max_upload_bytes());
    let mut chunks = body.into_data_stream();
    deadline
        .run(Stage::Decode, async {
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|e| UploadError::MalformedInput(e.to_string()))?;
                buffer.push(&chunk)?;
            }
            Ok::<_, UploadError>(())
        })
        .await??;

    let document = parse_metadata(&buffer.finish())?;
    let metadata_cid = pipeline
        .publish_metadata(&Value::Object(document), &deadline)
        .await?;

    info!(metadata_cid = %metadata_cid, "Metadata published");
    Ok(Json(MetadataResponse {
        ok: true,
        token_uri: metadata_cid.ipfs_uri(),
        metadata_cid,
    }))
}

//! `POST /api/upload`: multipart image plus optional `metadata.json`.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::Serialize;
use tracing::{info, instrument};

use pinforge_core::{Stage, UploadError, UploadResult};
use pinforge_media::PartStream;

use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub result: UploadResult,
}

/// Handler for `POST /api/upload`
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn upload(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UploadResponse>, ApiError> {
    let pipeline = state.pipeline()?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| UploadError::MalformedInput("missing Content-Type header".to_string()))?;

    let deadline = state.deadline();
    let parts = PartStream::from_content_type(
        content_type,
        body.into_data_stream(),
        state.decode_limits(),
    )?;
    let parts = deadline.run(Stage::Decode, parts.collect_parts()).await??;

    let result = pipeline.process(&parts, &deadline).await?;
    info!(
        image_cid = %result.image_cid,
        metadata_cid = %result.metadata_cid,
        "Upload complete"
    );
    Ok(Json(UploadResponse { ok: true, result }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use futures::stream::{self, StreamExt};
    use pinforge_storage::MemoryStore;
    use tower::ServiceExt;

    use crate::server::{build_router, GatewayState};
    use crate::testing::{
        memory_state, multipart_body, multipart_request, read_json, settings, state_with,
        state_with_settings, BOUNDARY,
    };

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake image bytes";

    #[tokio::test]
    async fn uploads_image_then_metadata() {
        let (state, store) = memory_state(1024);
        let body = multipart_body(&[
            ("file", Some("cat.png"), Some("image/png"), PNG),
            ("meta", Some("metadata.json"), Some("application/json"), br#"{"name":"Cat"}"#),
        ]);

        let response = build_router(state)
            .oneshot(multipart_request("/api/upload", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = read_json(response).await;
        assert_eq!(json["ok"], true);
        let image_cid = json["imageCid"].as_str().unwrap();
        assert_eq!(json["imageUrl"], format!("ipfs://{image_cid}"));
        assert_eq!(image_cid, MemoryStore::cid_for(PNG).as_str());

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].file_name, "cat.png");
        assert_eq!(calls[1].file_name, "metadata.json");
        assert_eq!(json["metadataCid"], calls[1].cid.as_str());

        let stored = store.get(&calls[1].cid).unwrap();
        let document: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(document["name"], "Cat");
        assert_eq!(document["image"], format!("ipfs://{image_cid}"));
        assert_eq!(document["description"], "Uploaded via pinforge");
    }

    #[tokio::test]
    async fn oversized_file_is_413_and_nothing_is_stored() {
        let (state, store) = memory_state(8);
        let body = multipart_body(&[("file", Some("cat.png"), Some("image/png"), PNG)]);

        let response = build_router(state)
            .oneshot(multipart_request("/api/upload", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = read_json(response).await;
        assert_eq!(json["kind"], "payload_too_large");
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn missing_file_part_is_400() {
        let (state, store) = memory_state(1024);
        let body = multipart_body(&[("note", None, None, b"hello")]);

        let response = build_router(state)
            .oneshot(multipart_request("/api/upload", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["stage"], "validate");
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn invalid_metadata_json_is_400() {
        let (state, _) = memory_state(1024);
        let body = multipart_body(&[
            ("file", Some("cat.png"), Some("image/png"), PNG),
            ("meta", Some("metadata.json"), None, b"{not json"),
        ]);

        let response = build_router(state)
            .oneshot(multipart_request("/api/upload", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["kind"], "client_input");
    }

    #[tokio::test]
    async fn non_multipart_content_type_is_400() {
        let (state, _) = memory_state(1024);
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();

        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["stage"], "decode");
    }

    #[tokio::test]
    async fn metadata_failure_reports_metadata_stage() {
        let (state, store) = state_with(MemoryStore::new().fail_on_call(2), 1024);
        let body = multipart_body(&[("file", Some("cat.png"), Some("image/png"), PNG)]);

        let response = build_router(state)
            .oneshot(multipart_request("/api/upload", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = read_json(response).await;
        assert_eq!(json["ok"], false);
        assert_eq!(json["stage"], "metadata");
        assert!(json.get("imageCid").is_none());
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn stalled_body_times_out_in_decode() {
        let mut limits = settings(1024);
        limits.request_timeout = Duration::from_millis(50);
        let (state, store) = state_with_settings(MemoryStore::new(), limits);

        // Everything up to the closing boundary, then silence.
        let mut head = multipart_body(&[("file", Some("cat.png"), None, b"partial")]);
        head.truncate(head.len() - format!("\r\n--{BOUNDARY}--\r\n").len());
        let body = stream::iter(vec![Ok::<_, std::io::Error>(head)]).chain(stream::pending());
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from_stream(body))
            .unwrap();

        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = read_json(response).await;
        assert_eq!(json["stage"], "decode");
        assert_eq!(json["kind"], "upstream_dependency");
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn many_small_fields_hit_the_body_ceiling() {
        let mut limits = settings(16);
        limits.max_body_bytes = 2048;
        let (state, store) = state_with_settings(MemoryStore::new(), limits);

        let junk: Vec<_> = (0..200)
            .map(|_| ("junk", None, None, &b"0123456789abcdef"[..]))
            .collect();
        let response = build_router(state)
            .oneshot(multipart_request("/api/upload", multipart_body(&junk)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(read_json(response).await["kind"], "payload_too_large");
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn missing_credential_is_500_configuration() {
        let state = GatewayState::new(None, "web3", settings(1024));
        let body = multipart_body(&[("file", Some("cat.png"), Some("image/png"), PNG)]);

        let response = build_router(state)
            .oneshot(multipart_request("/api/upload", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = read_json(response).await;
        assert_eq!(json["kind"], "configuration");
        assert!(json["error"].as_str().unwrap().contains("WEB3STORAGE_TOKEN"));
    }
}

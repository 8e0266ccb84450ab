//! Shared fixtures for the router tests.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use http_body_util::BodyExt;
use pinforge_core::{ContentStore, MetadataDefaults};
use pinforge_storage::MemoryStore;
use serde_json::Value;

use crate::server::{GatewayState, UploadSettings};

pub(crate) const BOUNDARY: &str = "pinforge-test-boundary";

pub(crate) fn settings(limit: u64) -> UploadSettings {
    UploadSettings {
        max_upload_bytes: limit,
        max_body_bytes: limit * 4 + 64 * 1024,
        request_timeout: Duration::from_secs(5),
        defaults: MetadataDefaults {
            name: "Untitled".into(),
            description: "Uploaded via pinforge".into(),
        },
    }
}

pub(crate) fn state_with(store: MemoryStore, limit: u64) -> (GatewayState, Arc<MemoryStore>) {
    state_with_settings(store, settings(limit))
}

pub(crate) fn state_with_settings(
    store: MemoryStore,
    settings: UploadSettings,
) -> (GatewayState, Arc<MemoryStore>) {
    let store = Arc::new(store);
    let shared: Arc<dyn ContentStore> = store.clone();
    (GatewayState::new(Some(shared), "memory", settings), store)
}

pub(crate) fn memory_state(limit: u64) -> (GatewayState, Arc<MemoryStore>) {
    state_with(MemoryStore::new(), limit)
}

/// `(field, filename, content type, payload)` per part.
pub(crate) fn multipart_body(parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, file_name, content_type, payload) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{field}\"");
        if let Some(file_name) = file_name {
            disposition.push_str(&format!("; filename=\"{file_name}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(crate) fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub(crate) async fn read_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

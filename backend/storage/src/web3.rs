use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::debug;

use pinforge_core::{Cid, ContentStore, StoreError};

use crate::{error_for_status, transport_error};

/// web3.storage upload API client.
pub struct Web3StorageClient {
    client: Client,
    token: String,
    base_url: String,
}

impl Web3StorageClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: "https://api.web3.storage".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    cid: String,
}

#[async_trait]
impl ContentStore for Web3StorageClient {
    fn name(&self) -> &str {
        "web3"
    }

    async fn put(&self, bytes: Bytes, filename: &str, media_type: &str) -> Result<Cid, StoreError> {
        debug!(filename, media_type, bytes = bytes.len(), "Uploading to web3.storage");

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, media_type)
            .header("X-Name", encode_name(filename))
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, body));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("web3.storage: {e}")))?;
        Ok(Cid::new(upload.cid))
    }
}

/// Percent-encode a filename for the `X-Name` header.
fn encode_name(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

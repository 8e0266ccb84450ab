use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use pinforge_core::{Cid, ContentStore, StoreError};

use crate::{error_for_status, transport_error};

/// Client for a Kubo (go-ipfs) node's `/api/v0/add` RPC endpoint.
pub struct IpfsNodeClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl IpfsNodeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Bearer credential for nodes behind an authenticating proxy.
    pub fn with_token(mut self, token: Option<impl Into<String>>) -> Self {
        self.token = token.map(Into::into);
        self
    }
}

/// One line of the add response: `{"Name":"cat.png","Hash":"bafy...","Size":"123"}`.
#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[async_trait]
impl ContentStore for IpfsNodeClient {
    fn name(&self) -> &str {
        "kubo"
    }

    async fn put(&self, bytes: Bytes, filename: &str, media_type: &str) -> Result<Cid, StoreError> {
        debug!(filename, media_type, bytes = bytes.len(), "Adding to IPFS node");

        let form = Form::new().part("file", file_part(bytes, filename, media_type)?);

        let mut request = self
            .client
            .post(format!("{}/api/v0/add", self.base_url))
            .query(&[("cid-version", "1"), ("pin", "true")])
            .multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, body));
        }

        let text = response.text().await.map_err(transport_error)?;
        parse_add_response(&text)
    }
}

/// The payload is handed to reqwest as-is; `Bytes` clones share the buffer.
fn file_part(bytes: Bytes, filename: &str, media_type: &str) -> Result<Part, StoreError> {
    let len = bytes.len() as u64;
    Part::stream_with_length(reqwest::Body::from(bytes), len)
        .file_name(filename.to_string())
        .mime_str(media_type)
        .map_err(|e| StoreError::Transport(format!("invalid media type '{media_type}': {e}")))
}

/// The node may stream several JSON lines; the last names the added object.
fn parse_add_response(text: &str) -> Result<Cid, StoreError> {
    let line = text
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| StoreError::InvalidResponse("empty response from IPFS node".to_string()))?;
    let added: AddResponse = serde_json::from_str(line)
        .map_err(|e| {
            StoreError::InvalidResponse(format!("unexpected IPFS response '{line}': {e}"))
        })?;
    Ok(Cid::new(added.hash))
}

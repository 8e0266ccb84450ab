//! pinforge Gateway HTTP API Server
//!
//! Exposes the multipart upload endpoint, the metadata-only publish
//! endpoint and a health check.

pub mod error;
pub mod health_api;
pub mod metadata_api;
pub mod server;
pub mod upload_api;

#[cfg(test)]
mod testing;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState, UploadSettings};

//! Mapping of upload failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use pinforge_core::{ErrorKind, Stage, UploadError};

/// An [`UploadError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub UploadError);

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
    kind: ErrorKind,
    stage: Stage,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let stage = self.0.stage();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, ?kind, %stage, "Upload failed");
        } else {
            warn!(error = %self.0, ?kind, %stage, "Upload rejected");
        }

        let body = ErrorBody {
            ok: false,
            error: self.0.to_string(),
            kind,
            stage,
        };
        (status, Json(body)).into_response()
    }
}

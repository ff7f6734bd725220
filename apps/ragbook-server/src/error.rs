use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ragbook_core::error::Error;
use serde_json::json;
use tracing::{error, warn};

/// Request-scoped failure rendered as `{"error": kind, "message": text}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            Error::Upstream { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Upstream { .. } | Error::MalformedOutput { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self { Self(err) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            warn!(kind = self.0.kind(), error = %self.0, "request rejected");
        }
        let body = Json(json!({ "error": self.0.kind(), "message": self.0.to_string() }));
        (status, body).into_response()
    }
}

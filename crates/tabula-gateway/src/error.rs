use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use tabula_core::error::TabulaError;

/// HTTP-facing error wrapper.
///
/// Client mistakes map to 400, upstream model failures to 502, and
/// everything else to 500. The body always carries the message.
pub struct ApiError(pub TabulaError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if self.0.is_upstream_error() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<TabulaError> for ApiError {
    fn from(err: TabulaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let client = ApiError(TabulaError::UnknownTemplate("바".into()));
        assert_eq!(client.status(), StatusCode::BAD_REQUEST);

        let upstream = ApiError(TabulaError::LlmRequest("503 from provider".into()));
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let server = ApiError(TabulaError::Database("connection refused".into()));
        assert_eq!(server.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

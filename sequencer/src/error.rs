//! Renders `CoreError` as the `{error, code}` wire shape of `spec.md` §6,
//! with the matching HTTP status (`spec.md` §7, "propagation policy").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sequencer_types::CoreError;
use serde::Serialize;
use tracing::{debug, error, info};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: u32,
}

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // §7: mechanical rejections are debug-only; crypto failures get
        // info-level voter/process context (added by the caller's span);
        // internal errors are logged in full and surfaced generically.
        match &self.0 {
            CoreError::Internal(reason) => error!(reason, "internal error"),
            CoreError::CryptographicFailure(_) => info!(error = %self.0, "cryptographic failure"),
            _ => debug!(error = %self.0, "request rejected"),
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}

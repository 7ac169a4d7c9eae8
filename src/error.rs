use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// The server's internal error taxonomy.
///
/// Upstream ADO soft-failures and unhandled webhook event types never
/// surface as an `Error` — they degrade to `None`/empty results and are
/// logged at debug level instead. Only client-facing validation/auth
/// problems and fatal store I/O failures are represented here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("missing eventType in webhook payload")]
    MissingEventType,
    #[error("client not found")]
    ClientNotFound,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("store I/O error: {0}")]
    Store(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidSignature => StatusCode::UNAUTHORIZED,
            Error::MissingEventType | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::ClientNotFound => StatusCode::NOT_FOUND,
            Error::Store(_) | Error::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

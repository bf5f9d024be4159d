use crate::services::gateway_service::GatewayError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use uuid::Uuid;

/// Error returned to HTTP clients.
///
/// Backend failures carry a `reference` id instead of the backend's own
/// message; the detailed error is logged under the same id.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub reference: Option<Uuid>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            reference: None,
        }
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Generic 500 tagged with a fresh reference id.
    pub fn backend() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "storage backend request failed".into(),
            reference: Some(Uuid::new_v4()),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "status": self.status.as_u16()
        });
        if let Some(reference) = self.reference {
            body["reference"] = json!(reference);
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Storage(source) => {
                let app_err = AppError::backend();
                tracing::error!(
                    reference = ?app_err.reference,
                    "storage backend error: {}",
                    source
                );
                app_err
            }
            client_err => {
                tracing::debug!("rejected request: {}", client_err);
                AppError::bad_request(client_err.to_string())
            }
        }
    }
}

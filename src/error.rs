use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the amocrm-bridge service.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    // ── Token Errors ────────────────────────────────────────────────────
    #[error("Token refresh failed: {0}")]
    Auth(String),

    #[error("No amoCRM access token available")]
    NoToken,

    // ── CRM API Errors ──────────────────────────────────────────────────
    #[error("amoCRM {operation} failed with status {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("amoCRM request failed: {0}")]
    Transport(String),

    #[error("Failed to decode amoCRM response: {0}")]
    Decode(String),

    #[error("amoCRM returned no {0}")]
    MissingEntity(&'static str),

    // ── Request Errors ──────────────────────────────────────────────────
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for CrmError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            CrmError::Auth(_) => (StatusCode::BAD_GATEWAY, "auth_error"),
            CrmError::NoToken => (StatusCode::SERVICE_UNAVAILABLE, "no_token"),
            CrmError::Api { .. } => (StatusCode::BAD_GATEWAY, "api_error"),
            CrmError::Transport(_) => (StatusCode::BAD_GATEWAY, "transport_error"),
            CrmError::Decode(_) => (StatusCode::BAD_GATEWAY, "decode_error"),
            CrmError::MissingEntity(_) => (StatusCode::BAD_GATEWAY, "missing_entity"),
            CrmError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        }

        let body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

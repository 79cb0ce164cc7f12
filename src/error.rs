use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::NoSensorData;

/// Failures of the chat-completion gateway.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GatewayError {
    /// the client was never initialized (e.g. no credential); no call was attempted
    #[error("AI client is not available: {0}")]
    Unavailable(String),
    /// transport failure or an error reported by the provider, text passed through
    #[error("{0}")]
    Upstream(String),
}

/// Every way a request can fail, mapped to a status code and JSON envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    Upstream(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Front-end build not found in {0}. Build the web app first")]
    FrontendMissing(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable(_) | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::FrontendMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(reason) => {
                ApiError::ServiceUnavailable(format!("AI client is not available: {}", reason))
            }
            GatewayError::Upstream(msg) => ApiError::Upstream(msg),
        }
    }
}

impl From<NoSensorData> for ApiError {
    fn from(_: NoSensorData) -> Self {
        ApiError::BadRequest(
            "No sensor data received yet; send the values in the request body".to_string(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let body = match self {
            // asset routes answer in the shape the front-end tooling expects
            ApiError::NotFound(_) | ApiError::FrontendMissing(_) => json!({ "error": message }),
            _ => json!({ "status": "error", "message": message }),
        };
        (status, Json(body)).into_response()
    }
}

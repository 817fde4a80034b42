use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::conversation::{ChatError, ErrorKind, DEFAULT_USER_MESSAGE};
use crate::services::roi::RoiError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Chat error: {error}")]
    Chat { error: ChatError, expose_detail: bool },

    #[error("ROI error: {error}")]
    Roi { error: RoiError, expose_detail: bool },
}

impl ApiError {
    /// `expose_detail` attaches the raw error text (development only)
    pub fn chat(error: ChatError, expose_detail: bool) -> Self {
        Self::Chat { error, expose_detail }
    }

    pub fn roi(error: RoiError, expose_detail: bool) -> Self {
        Self::Roi { error, expose_detail }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_friendly_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: None,
            user_friendly_message: None,
            error: None,
        }
    }
}

fn chat_status(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::EnvVarMissing => (StatusCode::SERVICE_UNAVAILABLE, "Chat service configuration error"),
        ErrorKind::TokenExpired => (StatusCode::UNAUTHORIZED, "Chat service authentication error"),
        ErrorKind::ApiError => (StatusCode::BAD_GATEWAY, "Chat service API error"),
        ErrorKind::ChatProcessing => (StatusCode::INTERNAL_SERVER_ERROR, "Error processing message"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg))
            }
            ApiError::Chat { error, expose_detail } => {
                let (status, message) = chat_status(error.kind);
                tracing::error!("Chat error [{}]: {}", error.kind, error.message);

                let mut body = ErrorResponse::new(message);
                body.code = Some(error.kind.code());
                body.user_friendly_message = Some(if error.user_message.is_empty() {
                    DEFAULT_USER_MESSAGE.to_string()
                } else {
                    error.user_message
                });
                body.error = expose_detail.then_some(error.message);
                (status, body)
            }
            ApiError::Roi { error, expose_detail } => {
                let status = match error {
                    RoiError::InvalidBill(_) => StatusCode::BAD_REQUEST,
                };
                tracing::warn!("ROI error: {}", error);

                let mut body = ErrorResponse::new("Error calculating ROI");
                body.error = expose_detail.then(|| error.to_string());
                (status, body)
            }
        };

        (status, Json(body)).into_response()
    }
}

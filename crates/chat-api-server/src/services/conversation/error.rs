//! Failure classification for the chat path

use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_USER_MESSAGE: &str =
    "Sorry, I encountered an issue while processing your message. Please try again later.";

/// Machine-readable failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Upstream configuration absent (e.g. API key)
    #[serde(rename = "ENV_VAR_MISSING")]
    EnvVarMissing,
    /// Upstream credential rejected
    #[serde(rename = "TOKEN_EXPIRED")]
    TokenExpired,
    /// Upstream call failed at the protocol/service level
    #[serde(rename = "API_ERROR")]
    ApiError,
    /// Catch-all assigned when the collaborator gave no kind
    #[serde(rename = "CHAT_PROCESSING_ERROR")]
    ChatProcessing,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EnvVarMissing => "ENV_VAR_MISSING",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::ApiError => "API_ERROR",
            Self::ChatProcessing => "CHAT_PROCESSING_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Failure reported by a model provider. Kind and user message are optional.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: Option<ErrorKind>,
    pub message: String,
    pub user_message: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: message.into(),
            user_message: None,
        }
    }

    pub fn unclassified(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: message.into(),
            user_message: None,
        }
    }

    pub fn with_user_message(mut self, user_message: impl Into<String>) -> Self {
        self.user_message = Some(user_message.into());
        self
    }
}

/// Fully classified failure surfaced by the orchestrator
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct ChatError {
    pub kind: ErrorKind,
    pub message: String,
    pub user_message: String,
}

impl From<ProviderError> for ChatError {
    fn from(err: ProviderError) -> Self {
        Self {
            kind: err.kind.unwrap_or(ErrorKind::ChatProcessing),
            message: err.message,
            user_message: err
                .user_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_MESSAGE.to_string()),
        }
    }
}

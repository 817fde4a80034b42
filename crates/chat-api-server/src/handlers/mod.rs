use axum::extract::FromRequest;

use crate::utils::error::ApiError;

pub mod chat;
pub mod health;
pub mod roi;

/// `Json` extractor whose rejections use the API error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

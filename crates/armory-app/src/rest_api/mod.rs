use axum::extract::FromRequest;

use crate::error::ApiError;

pub mod gun;

/// JSON extractor answering malformed bodies with JSON error
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    extract::multipart::{MultipartError, MultipartRejection},
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    ResourceNotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid data: {0}")]
    UnprocessableRequest(String),
    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

impl From<armory_dal::Error> for ApiError {
    fn from(value: armory_dal::Error) -> Self {
        match value {
            armory_dal::Error::RecordNotFound(what) => ApiError::ResourceNotFound(what),
            armory_dal::Error::Conflict(msg) => ApiError::Conflict(msg),
            armory_dal::Error::Unavailable(e) => {
                error!("Storage error: {e}");
                ApiError::InternalError(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(value: FormRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(value: MultipartRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(value: MultipartError) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<garde::Report> for ApiError {
    fn from(value: garde::Report) -> Self {
        ApiError::UnprocessableRequest(value.to_string())
    }
}

/// Error for HTML pages, same kinds as [`ApiError`] but answered as plain text
#[derive(Debug)]
pub struct PageError {
    error: ApiError,
    action: Option<&'static str>,
}

impl PageError {
    /// Maps error so internal failures are reported as `Error <action>: ...`
    pub fn during<E: Into<ApiError>>(action: &'static str) -> impl FnOnce(E) -> PageError {
        move |e| PageError {
            error: e.into(),
            action: Some(action),
        }
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::ResourceNotFound(what.to_string()).into()
    }
}

impl From<ApiError> for PageError {
    fn from(error: ApiError) -> Self {
        PageError {
            error,
            action: None,
        }
    }
}

impl From<armory_dal::Error> for PageError {
    fn from(error: armory_dal::Error) -> Self {
        ApiError::from(error).into()
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let message = match (&self.error, self.action) {
            (ApiError::InternalError(msg), Some(action)) => format!("Error {action}: {msg}"),
            (error, _) => error.to_string(),
        };
        (status, message).into_response()
    }
}

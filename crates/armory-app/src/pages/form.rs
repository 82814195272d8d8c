use axum::extract::{FromRequest, Multipart, Request};
use axum::Form;
use tracing::debug;

use crate::{
    error::{ApiError, PageError},
    mapper::GunForm,
    state::AppState,
};

const IMAGE_FIELD: &str = "image";

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Accepts both urlencoded and multipart forms, only multipart can carry image
impl FromRequest<AppState> for GunForm {
    type Rejection = PageError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(ApiError::from)?;
            return Ok(fields.into_iter().collect());
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(ApiError::from)?;
        let mut form = GunForm::default();
        while let Some(field) = multipart.next_field().await.map_err(ApiError::from)? {
            let Some(name) = field.name().map(|n| n.to_string()) else {
                continue;
            };
            if name == IMAGE_FIELD {
                let file_name = field.file_name().map(|n| n.to_string());
                let data = field.bytes().await.map_err(ApiError::from)?;
                debug!("Received image {file_name:?} of {} bytes", data.len());
                form.set_image(data.to_vec());
            } else {
                let value = field.text().await.map_err(ApiError::from)?;
                form.add_field(name, value);
            }
        }
        Ok(form)
    }
}

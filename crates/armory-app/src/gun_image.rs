use armory_dal::gun::GunRepository;
use axum::{
    extract::Path,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use tracing::debug;

use crate::{error::PageError, parse_id};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type recognized from image signature
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    match ::image::guess_format(data) {
        Ok(format) => format.to_mime_type(),
        Err(_) => DEFAULT_CONTENT_TYPE,
    }
}

/// Serves stored image, missing gun and gun without image are both not found
pub async fn serve_image(
    Path(id): Path<String>,
    repository: GunRepository,
) -> Result<impl IntoResponse, PageError> {
    let id = parse_id(&id)?;
    let gun = match repository.get(id).await {
        Ok(gun) => gun,
        Err(armory_dal::Error::RecordNotFound(_)) => return Err(PageError::not_found("Image")),
        Err(e) => return Err(e.into()),
    };
    let data = match gun.image {
        Some(data) if !data.is_empty() => data,
        _ => return Err(PageError::not_found("Image")),
    };

    let mime = sniff_content_type(&data);
    debug!("Serving image of gun {id}, {} bytes of {mime}", data.len());
    let mut headers = HeaderMap::new();
    headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(mime));
    headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from(data.len()));

    Ok((StatusCode::OK, headers, data))
}

use armory_dal::gun::GunRepository;
#[cfg(feature = "openapi")]
use armory_dal::gun::Gun;
use axum::{
    extract::Path,
    response::IntoResponse,
    routing::get,
    Json,
};
use garde::Validate as _;
use http::StatusCode;
use serde_json::json;
use tracing::debug;

use super::ApiJson;
use crate::{
    error::ApiResult,
    mapper::{self, GunInput, GunPayload},
    parse_id,
    state::AppState,
};

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(list, get_one, create, update, delete))]
struct ApiDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ApiDocs::openapi()
}

fn validated(payload: GunPayload) -> ApiResult<GunInput> {
    let input = GunInput::from(payload);
    input.validate()?;
    Ok(input)
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "", tag = "Gun", operation_id = "listGuns",
    responses((status = StatusCode::OK, description = "All guns sorted by id", body = Vec<Gun>))))]
pub async fn list(repository: GunRepository) -> ApiResult<impl IntoResponse> {
    let guns = repository.list_all().await?;
    Ok((StatusCode::OK, Json(guns)))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{id}", tag = "Gun", operation_id = "getGun",
    params(("id" = i64, Path, description = "Gun id")),
    responses((status = StatusCode::OK, description = "Get one", body = Gun),
        (status = StatusCode::NOT_FOUND, description = "Gun not found"))))]
pub async fn get_one(
    Path(id): Path<String>,
    repository: GunRepository,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let record = repository.get(id).await?;

    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = "Gun", operation_id = "createGun",
    request_body = GunPayload,
    responses((status = StatusCode::CREATED, description = "Created Gun", body = Gun))))]
pub async fn create(
    repository: GunRepository,
    ApiJson(payload): ApiJson<GunPayload>,
) -> ApiResult<impl IntoResponse> {
    let input = validated(payload)?;
    let record = repository.create(mapper::changes(input)).await?;
    debug!("Created gun {} via API", record.id);

    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(put, path = "/{id}", tag = "Gun", operation_id = "updateGun",
    params(("id" = i64, Path, description = "Gun id")),
    request_body(content = GunPayload, description = "Full replacement, omitted optional fields are cleared"),
    responses((status = StatusCode::OK, description = "Updated Gun", body = Gun))))]
pub async fn update(
    Path(id): Path<String>,
    repository: GunRepository,
    ApiJson(payload): ApiJson<GunPayload>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let input = validated(payload)?;
    let record = repository.update(id, mapper::changes(input)).await?;

    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/{id}", tag = "Gun", operation_id = "deleteGun",
    params(("id" = i64, Path, description = "Gun id")),
    responses((status = StatusCode::OK, description = "Deleted"))))]
pub async fn delete(
    Path(id): Path<String>,
    repository: GunRepository,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    repository.delete(id).await?;

    Ok((StatusCode::OK, Json(json!({"message": "Deleted"}))))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).put(update).delete(delete))
}

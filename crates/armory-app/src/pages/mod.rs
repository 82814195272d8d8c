//! Server rendered HTML pages, forms are posted back and answered with redirect

use armory_dal::gun::GunRepository;
use axum::{
    extract::{DefaultBodyLimit, Path, Query},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use garde::Validate as _;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    error::{ApiError, PageError},
    gun_image::serve_image,
    mapper::{self, GunForm, GunInput},
    parse_id,
    state::AppState,
};

mod form;
pub mod render;

const LIST_URL: &str = "/guns";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    q: Option<String>,
}

fn validated(form: GunForm) -> Result<GunInput, ApiError> {
    let input = GunInput::from(form);
    input.validate()?;
    Ok(input)
}

async fn list_guns(
    repository: GunRepository,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, PageError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    let guns = repository
        .list(Some(q))
        .await
        .map_err(PageError::during("fetching guns"))?;
    let total_value: f64 = guns.iter().filter_map(|g| g.value).sum();
    Ok(Html(render::list_page(&guns, q, total_value)))
}

async fn show_gun(
    Path(id): Path<String>,
    repository: GunRepository,
) -> Result<impl IntoResponse, PageError> {
    let id = parse_id(&id)?;
    let gun = repository.get(id).await?;
    Ok(Html(render::detail_page(&gun)))
}

async fn new_form() -> impl IntoResponse {
    Html(render::form_page(None))
}

async fn edit_form(
    Path(id): Path<String>,
    repository: GunRepository,
) -> Result<impl IntoResponse, PageError> {
    let id = parse_id(&id)?;
    let gun = repository.get(id).await?;
    Ok(Html(render::form_page(Some(&gun))))
}

async fn create_gun(
    repository: GunRepository,
    form: GunForm,
) -> Result<impl IntoResponse, PageError> {
    let input = validated(form)?;
    let gun = repository
        .create(mapper::changes(input))
        .await
        .map_err(PageError::during("creating gun"))?;
    info!("Created gun {} ({})", gun.id, gun.gun_name);
    Ok(Redirect::to(LIST_URL))
}

async fn update_gun(
    Path(id): Path<String>,
    repository: GunRepository,
    form: GunForm,
) -> Result<impl IntoResponse, PageError> {
    let id = parse_id(&id)?;
    let input = validated(form)?;
    repository
        .update(id, mapper::changes(input))
        .await
        .map_err(PageError::during("updating gun"))?;
    debug!("Updated gun {id}");
    Ok(Redirect::to(LIST_URL))
}

async fn delete_gun(
    Path(id): Path<String>,
    repository: GunRepository,
) -> Result<impl IntoResponse, PageError> {
    let id = parse_id(&id)?;
    repository
        .delete(id)
        .await
        .map_err(PageError::during("deleting gun"))?;
    info!("Deleted gun {id}");
    Ok(Redirect::to(LIST_URL))
}

pub fn router(limit_mb: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(list_guns).post(create_gun))
        .route("/new", get(new_form))
        .route("/{id}", get(show_gun).post(update_gun))
        .route("/{id}/edit", get(edit_form))
        .route("/{id}/image", get(serve_image))
        .route("/{id}/delete", post(delete_gun))
        .layer(DefaultBodyLimit::max(1024 * 1024 * limit_mb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{body_bytes, test_state};
    use armory_dal::gun::{FieldValue, GunChanges, GunRepositoryImpl};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt as _;
    use tracing_test::traced_test;

    const BOUNDARY: &str = "XxGunBoundaryxX";

    fn app(state: AppState) -> Router {
        Router::new().nest("/guns", router(1)).with_state(state)
    }

    fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, fields: &[(&str, &str)], image: Option<&[u8]>) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(data) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"gun.bin\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn text(response: axum::response::Response) -> String {
        String::from_utf8(body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_create_update_delete() {
        let state = test_state().await;
        let repository = GunRepositoryImpl::new(state.pool().clone());
        let app = app(state);

        let response = app
            .clone()
            .oneshot(form_request(
                "/guns",
                "gun_name=Winchester+1873&year=1899&condition=bad&value=750.5&description=Lever+action",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/guns");

        let guns = repository.list_all().await.unwrap();
        assert_eq!(guns.len(), 1);
        let gun = &guns[0];
        assert_eq!(gun.year, Some(1899));
        assert_eq!(gun.condition, None);
        assert_eq!(gun.value, Some(750.5));

        let response = app
            .clone()
            .oneshot(form_request(
                &format!("/guns/{}", gun.id),
                "gun_name=Winchester+1873&description=",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let updated = repository.get(gun.id).await.unwrap();
        assert_eq!(updated.year, None);
        assert_eq!(updated.value, None);
        assert_eq!(updated.description, None);

        let response = app
            .clone()
            .oneshot(form_request(&format!("/guns/{}/delete", gun.id), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(repository.count().await.unwrap(), 0);

        let response = app
            .oneshot(form_request(&format!("/guns/{}/delete", gun.id), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_multipart_with_image() {
        let state = test_state().await;
        let repository = GunRepositoryImpl::new(state.pool().clone());
        let app = app(state);

        let response = app
            .clone()
            .oneshot(multipart_request(
                "/guns",
                &[("gun_name", "Mauser C96"), ("year", "1896")],
                Some(&[0x01, 0x02]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let gun = repository.list_all().await.unwrap().remove(0);
        assert_eq!(gun.image, Some(vec![0x01, 0x02]));

        let image_url = format!("/guns/{}/image", gun.id);
        let response = app.clone().oneshot(get(&image_url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        assert_eq!(body_bytes(response).await, vec![0x01, 0x02]);

        // update without file keeps image
        let response = app
            .clone()
            .oneshot(multipart_request(
                &format!("/guns/{}", gun.id),
                &[("gun_name", "Mauser C96 Broomhandle")],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let updated = repository.get(gun.id).await.unwrap();
        assert_eq!(updated.gun_name, "Mauser C96 Broomhandle");
        assert_eq!(updated.year, None);
        assert_eq!(updated.image, Some(vec![0x01, 0x02]));
    }

    #[tokio::test]
    async fn test_repeated_fields_same_for_both_encodings() {
        let state = test_state().await;
        let repository = GunRepositoryImpl::new(state.pool().clone());
        let app = app(state);

        let response = app
            .clone()
            .oneshot(form_request("/guns", "gun_name=Early&gun_name=Late&year=1900&year=1910"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let response = app
            .oneshot(multipart_request(
                "/guns",
                &[("gun_name", "Early"), ("gun_name", "Late"), ("year", "1900"), ("year", "1910")],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let guns = repository.list_all().await.unwrap();
        assert_eq!(guns.len(), 2);
        for gun in guns {
            assert_eq!(gun.gun_name, "Late");
            assert_eq!(gun.year, Some(1910));
        }
    }

    #[tokio::test]
    async fn test_image_not_found() {
        let state = test_state().await;
        let repository = GunRepositoryImpl::new(state.pool().clone());
        let gun = repository.create(GunChanges::new("Plain")).await.unwrap();
        let app = app(state);

        let response = app
            .clone()
            .oneshot(get(&format!("/guns/{}/image", gun.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Image not found");

        let response = app.oneshot(get("/guns/999/image")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Image not found");
    }

    #[tokio::test]
    async fn test_list_filter_and_totals() {
        let state = test_state().await;
        let repository = GunRepositoryImpl::new(state.pool().clone());
        for (name, value) in [("Colt 1911", 1000.0), ("Luger P08", 1500.25), ("Colt SAA", 2000.0)] {
            repository
                .create(GunChanges::new(name).set(FieldValue::Value(value)))
                .await
                .unwrap();
        }
        let app = app(state);

        let response = app.clone().oneshot(get("/guns?q=COLT")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = text(response).await;
        assert!(page.contains("Colt 1911"));
        assert!(page.contains("Colt SAA"));
        assert!(!page.contains("Luger P08"));
        assert!(page.contains("<strong id=\"count\">2</strong>"));
        assert!(page.contains("<strong id=\"total-value\">3000.00</strong>"));
        assert!(page.contains("value=\"COLT\""));

        let response = app.oneshot(get("/guns")).await.unwrap();
        let page = text(response).await;
        assert!(page.contains("<strong id=\"count\">3</strong>"));
        assert!(page.contains("<strong id=\"total-value\">4500.25</strong>"));
    }

    #[tokio::test]
    async fn test_pages_errors() {
        let state = test_state().await;
        let app = app(state);

        let response = app.clone().oneshot(get("/guns/abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text(response).await, "Invalid ID");

        let response = app.clone().oneshot(get("/guns/12")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Gun not found");

        let response = app.clone().oneshot(get("/guns/12/edit")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/guns/new")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains("New gun"));
    }
}

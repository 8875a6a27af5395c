use super::{DeleteRequest, GalleryError, GalleryQuery, MoveRequest, PosterGallery, RenameRequest};
use crate::AppState;
use crate::auth::{is_authorized, unauthorized_response};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

fn authorized(app_state: &AppState, headers: &HeaderMap) -> bool {
    is_authorized(headers, &app_state.config.app, chrono::Utc::now())
}

fn into_json_response<T: serde::Serialize>(result: Result<T, GalleryError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => {
            error!("Gallery request failed: {}", e);
            e.into_response()
        }
    }
}

pub async fn list_handler(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<GalleryQuery>,
) -> Response {
    let result = async {
        let category = PosterGallery::category(&category)?;
        app_state
            .gallery
            .list(category, query.page.unwrap_or(1), query.search.as_deref())
            .await
    }
    .await;
    into_json_response(result)
}

pub async fn poster_handler(
    State(app_state): State<AppState>,
    Path((category, file_name)): Path<(String, String)>,
) -> Response {
    let path = match PosterGallery::category(&category) {
        Ok(category) => app_state.gallery.existing_file(category, &file_name).await,
        Err(e) => Err(e),
    };
    let path = match path {
        Ok(path) => path,
        Err(e) => {
            debug!("Poster {}/{} not served: {}", category, file_name, e);
            return e.into_response();
        }
    };

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            debug!("Failed to open poster {:?}: {}", path, e);
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        }
    };
    let metadata = match file.metadata().await {
        Ok(metadata) => metadata,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len())
        // Posters are replaced in place by re-imports.
        .header(header::CACHE_CONTROL, "public, max-age=300, must-revalidate");

    if let Ok(modified) = metadata.modified() {
        response = response.header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified));
    }

    let body = Body::from_stream(ReaderStream::new(file));
    response
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

pub async fn upload_handler(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    if !authorized(&app_state, &headers) {
        return unauthorized_response();
    }

    let result = async {
        let category = PosterGallery::category(&category)?;
        let (file_name, bytes) = read_file_field(multipart).await?;
        app_state
            .gallery
            .store_upload(category, &file_name, &bytes)
            .await
    }
    .await;

    into_json_response(result.map(|entry| json!({ "success": true, "item": entry })))
}

async fn read_file_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), GalleryError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GalleryError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| GalleryError::Upload("file field has no file name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| GalleryError::Upload(e.to_string()))?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(GalleryError::Upload("no file field in upload".to_string()))
}

pub async fn rename_handler(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RenameRequest>,
) -> Response {
    if !authorized(&app_state, &headers) {
        return unauthorized_response();
    }

    let result = async {
        let category = PosterGallery::category(&category)?;
        app_state
            .gallery
            .rename(category, &request.file, &request.new_name)
            .await
    }
    .await;

    into_json_response(result.map(|entry| json!({ "success": true, "item": entry })))
}

pub async fn move_handler(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
    headers: HeaderMap,
    Json(request): Json<MoveRequest>,
) -> Response {
    if !authorized(&app_state, &headers) {
        return unauthorized_response();
    }

    let result = async {
        let category = PosterGallery::category(&category)?;
        let target = PosterGallery::category(&request.target)?;
        app_state
            .gallery
            .move_to(category, &request.file, target)
            .await
    }
    .await;

    into_json_response(result.map(|entry| json!({ "success": true, "item": entry })))
}

pub async fn delete_handler(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
    headers: HeaderMap,
    Json(request): Json<DeleteRequest>,
) -> Response {
    if !authorized(&app_state, &headers) {
        return unauthorized_response();
    }

    let result = async {
        let category = PosterGallery::category(&category)?;
        app_state.gallery.delete(category, &request.file).await
    }
    .await;

    into_json_response(result.map(|()| json!({ "success": true })))
}

use crate::{errors::ApiError, handlers::common::map_service_error, AppState};
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

pub fn files_routes() -> Router<AppState> {
    Router::new().route("/:id", get(get_file))
}

/// Serve an uploaded file's bytes with its stored content type
#[utoipa::path(
    get,
    path = "/api/v1/file/:id",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File bytes"),
        (status = 400, description = "Unknown file id", body = crate::errors::ErrorResponse),
        (status = 422, description = "File empty", body = crate::errors::ErrorResponse)
    ),
    tag = "Files"
)]
pub(crate) async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (bytes, content_type) = state
        .services
        .files
        .read(id)
        .await
        .map_err(map_service_error)?;

    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        bytes,
    ))
}

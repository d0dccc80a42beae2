use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Stream a stored image. Object names never get reused, so the path doubles as the ETag.
/// A removed object answers 404 even to a matching `If-None-Match`.
#[instrument(skip(state, headers), fields(path = %path))]
pub async fn serve_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let store = state.object_store.as_ref();
    let size = store.size(&path).await?;

    let etag_value = format!("\"{path}\"");
    if headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag_value || v == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = store.get_stream(&path).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

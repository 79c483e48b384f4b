//! Bundle download endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::export::{build_bundle, ARCHIVE_NAME};
use crate::pipeline::CreativeResult;

/// Number of variations left out of the archive
const SKIPPED_HEADER: HeaderName = HeaderName::from_static("x-adcraft-skipped");

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/api/export", post(export_bundle))
}

#[derive(Debug, Deserialize)]
struct ExportRequest {
    variations: Vec<CreativeResult>,
}

async fn export_bundle(
    State(state): State<AppState>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::unprocessable(err.body_text()))?;
    if request.variations.is_empty() {
        return Err(ApiError::bad_request("no variations to export"));
    }

    let bundle = build_bundle(&state.http, &request.variations)
        .await
        .map_err(|e| ApiError::internal(format!("failed to build bundle: {}", e)))?;

    Ok((
        [
            (CONTENT_TYPE, "application/zip".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", ARCHIVE_NAME),
            ),
            (SKIPPED_HEADER, bundle.skipped.to_string()),
        ],
        bundle.bytes,
    )
        .into_response())
}

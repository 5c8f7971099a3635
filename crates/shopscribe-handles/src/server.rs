//! HTTP surface for the handle service.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use shopscribe_core::{HandleBatchRequest, HandleBatchResponse, HandleEntry};
use tracing::info;

use crate::HandleError;
use crate::service::HandleService;
use crate::spreadsheet::{
    EXPORT_FILE_NAME, ImportedNames, XLSX_CONTENT_TYPE, is_supported_file_name,
    read_product_names, write_handles,
};

/// Request bodies larger than this are rejected before reaching a handler.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
struct DownloadRequest {
    #[serde(default)]
    results: Vec<HandleEntry>,
}

/// Build the service router.
///
/// Routes: `GET /healthz`, `POST /generate`, `POST /upload`, `POST /download`.
pub fn router(service: Arc<HandleService>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/generate", post(generate))
        .route("/upload", post(upload))
        .route("/download", post(download))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(service)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn generate(
    State(service): State<Arc<HandleService>>,
    payload: Result<Json<HandleBatchRequest>, JsonRejection>,
) -> Result<Json<HandleBatchResponse>, HandleError> {
    let Json(request) = payload?;
    let results = service.generate(&request).await?;
    Ok(Json(HandleBatchResponse { results }))
}

async fn upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportedNames>, HandleError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if !is_supported_file_name(&file_name) {
            return Err(HandleError::UnsupportedFile);
        }
        let bytes = field.bytes().await?;
        let imported = tokio::task::spawn_blocking(move || read_product_names(&bytes))
            .await
            .map_err(|e| HandleError::Other(e.to_string()))??;
        info!(
            file = %file_name,
            names = imported.product_names.len(),
            product_col = imported.product_col,
            header_row = imported.header_row,
            "imported product names"
        );
        return Ok(Json(imported));
    }
    Err(HandleError::NoFile)
}

async fn download(
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, HandleError> {
    let Json(request) = payload?;
    let bytes = write_handles(&request.results)?;
    info!(rows = request.results.len(), bytes = bytes.len(), "exported handles");
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

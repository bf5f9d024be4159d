//! HTTP handlers for listing, uploading and deleting folder files.
//! Request parsing and validation happen here; folder/key logic is
//! delegated to `GatewayService`.

use crate::{
    errors::AppError,
    models::object::ListingPage,
    services::gateway_service::{DEFAULT_PAGE_SIZE, GatewayError, GatewayService},
};
use axum::{
    Json,
    extract::{
        Query, State,
        multipart::{Field, Multipart, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
};
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// Query params accepted by `GET /list_files`.
#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    /// Continuation token from a previous page.
    pub token: Option<String>,
    /// Page size, defaults to 1000.
    pub max: Option<usize>,
}

/// Body of `POST /delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub filename: Option<String>,
}

/// `GET /list_files` — one page of the folder listing.
pub async fn list_files(
    State(service): State<GatewayService>,
    query: Result<Query<ListFilesQuery>, QueryRejection>,
) -> Result<Json<ListingPage>, AppError> {
    let Query(q) = query.map_err(|err| GatewayError::InvalidRequest(err.body_text()))?;
    let page = service
        .list_page(q.token, q.max.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(page))
}

/// `POST /upload` — store the multipart `file` field in the folder.
pub async fn upload_file(
    State(service): State<GatewayService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|_| GatewayError::MissingFile)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| GatewayError::InvalidRequest(err.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.trim().is_empty() {
            return Err(GatewayError::MissingFile.into());
        }
        let content_type = field.content_type().map(str::to_string);
        let body = read_field(field).await?;

        let stored = service.upload(&filename, body, content_type).await?;
        return Ok(Json(UploadResponse {
            message: "Upload complete".into(),
            url: stored.url,
        }));
    }

    Err(GatewayError::MissingFile.into())
}

/// `POST /delete` — remove `filename` from the folder.
pub async fn delete_file(
    State(service): State<GatewayService>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let filename = match payload {
        Ok(Json(DeleteRequest {
            filename: Some(filename),
        })) if !filename.trim().is_empty() => filename,
        _ => return Err(GatewayError::MissingFilename.into()),
    };

    let name = service.delete(&filename).await?;
    Ok(Json(DeleteResponse {
        message: format!("{} removed", name),
    }))
}

/// Drain a multipart field into one contiguous buffer.
async fn read_field(field: Field<'_>) -> Result<Bytes, GatewayError> {
    let buffer = field
        .map_err(|err| GatewayError::InvalidRequest(err.body_text()))
        .try_fold(BytesMut::new(), |mut buffer, chunk| async move {
            buffer.extend_from_slice(&chunk);
            Ok(buffer)
        })
        .await?;
    Ok(buffer.freeze())
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    message: String,
    url: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    message: String,
}

//! Statement upload and batch query handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{get_user_id, AppError, AppState, MAX_PAGE_LIMIT};
use centime_core::import::{run_import, ImportRequest, MAX_IMPORT_BYTES};
use centime_core::models::{ImportBatch, StagedStatus, StagedTransaction};

/// Batch summary returned after an upload
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub batch_id: i64,
    pub source: String,
    pub source_name: String,
    pub status: String,
    pub total_rows: i64,
    pub imported_rows: i64,
    pub skipped_rows: i64,
    pub error_rows: i64,
    pub error_messages: Vec<String>,
}

/// POST /api/imports - Upload a statement file
///
/// Multipart form with a `file` part and an `account_id` text part.
pub async fn upload_import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<BatchSummary>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    let mut file_name: Option<String> = None;
    let mut content: Option<String> = None;
    let mut account_id: Option<i64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("Invalid multipart body"))?
    {
        match field.name() {
            Some("file") => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::payload_too_large("File exceeds the upload limit"))?;
                if bytes.len() > MAX_IMPORT_BYTES {
                    return Err(AppError::payload_too_large(&format!(
                        "File too large: {} bytes (limit {})",
                        bytes.len(),
                        MAX_IMPORT_BYTES
                    )));
                }
                content = Some(
                    String::from_utf8(bytes.to_vec())
                        .map_err(|_| AppError::bad_request("File is not valid UTF-8 text"))?,
                );
            }
            Some("account_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Invalid account_id field"))?;
                account_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::bad_request("account_id must be an integer"))?,
                );
            }
            _ => {}
        }
    }

    let content = content.ok_or_else(|| AppError::bad_request("Missing file part"))?;
    let account_id = account_id.ok_or_else(|| AppError::bad_request("Missing account_id part"))?;

    let request = ImportRequest {
        user_id,
        account_id,
        file_name,
        content,
        source_override: None,
    };
    let outcome = run_import(&state.db, &request)?;

    Ok(Json(BatchSummary {
        batch_id: outcome.batch_id,
        source: outcome.source.to_string(),
        source_name: outcome.source.display_name().to_string(),
        status: outcome.status.to_string(),
        total_rows: outcome.total_rows,
        imported_rows: outcome.imported_rows,
        skipped_rows: outcome.skipped_rows,
        error_rows: outcome.error_rows,
        error_messages: outcome.error_messages,
    }))
}

/// Query parameters for batch listing
#[derive(Debug, Deserialize)]
pub struct ListImportsQuery {
    pub limit: Option<i64>,
}

/// GET /api/imports - List the caller's batches, newest first
pub async fn list_imports(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListImportsQuery>,
) -> Result<Json<Vec<ImportBatch>>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_PAGE_LIMIT);
    let batches = state.db.list_batches(&user_id, limit)?;
    Ok(Json(batches))
}

/// GET /api/imports/:id - Fetch one batch
pub async fn get_import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ImportBatch>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;
    let batch = state
        .db
        .get_batch(&user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Import batch {} not found", id)))?;
    Ok(Json(batch))
}

/// Query parameters for staged row listing
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Review status filter; defaults to `pending`, `all` lifts it
    pub status: Option<String>,
}

/// GET /api/imports/:id/transactions - Staged rows of one batch
///
/// Returns the rows awaiting review by default; `?status=converted`,
/// `?status=rejected`, or `?status=all` widen the view.
pub async fn list_import_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<StagedTransaction>>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    let status = match query.status.as_deref() {
        None => Some(StagedStatus::Pending),
        Some("all") => None,
        Some(s) => Some(s.parse().map_err(|e: String| AppError::bad_request(&e))?),
    };

    // Ownership check before exposing rows
    state
        .db
        .get_batch(&user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Import batch {} not found", id)))?;
    let staged = state.db.list_staged_by_batch(&user_id, id, status)?;
    Ok(Json(staged))
}

//! Review handlers: bulk validation (conversion) and rejection

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{get_user_id, AppError, AppState};
use centime_core::models::StagedTransaction;
use centime_core::review;

/// Request body for bulk validation
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub ids: Vec<i64>,
    /// Per-row category overrides, keyed by staged transaction id
    #[serde(default)]
    pub categories: HashMap<i64, String>,
}

/// Conversion summary for a validate request
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub attempted: usize,
    pub validated: usize,
    pub errors: Vec<String>,
}

/// POST /api/imports/validate - Convert staged rows into ledger records
///
/// Row failures are collected, not fatal: the response reports how many
/// of the attempted rows converted.
pub async fn validate_staged(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;
    if req.ids.is_empty() {
        return Err(AppError::bad_request("No staged transaction ids provided"));
    }

    let mut validated = 0;
    let mut errors = Vec::new();
    for id in &req.ids {
        let category = req.categories.get(id).map(String::as_str);
        match review::convert_staged(&state.db, &state.db, &user_id, *id, category) {
            Ok(_) => validated += 1,
            Err(e) => {
                warn!(staged_id = id, error = %e, "Validation failed for staged row");
                errors.push(format!("{}: {}", id, e));
            }
        }
    }

    Ok(Json(ValidateResponse {
        attempted: req.ids.len(),
        validated,
        errors,
    }))
}

/// Request body for a pending-row category change
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    /// New suggested category; `null` clears it
    pub category: Option<String>,
}

/// PATCH /api/imports/transactions/:id - Recategorize a row still
/// awaiting review
///
/// Only pending rows can change; converted and rejected rows are 404.
pub async fn update_staged_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<StagedTransaction>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    let changed = state
        .db
        .update_staged_category(&user_id, id, req.category.as_deref())?;
    if !changed {
        return Err(AppError::not_found(&format!(
            "No pending staged transaction {}",
            id
        )));
    }

    let row = state
        .db
        .get_staged(&user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Staged transaction {} not found", id)))?;
    Ok(Json(row))
}

/// Request body for bulk rejection
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub ids: Vec<i64>,
}

/// Rejection summary
#[derive(Debug, Serialize)]
pub struct RejectResponse {
    pub attempted: usize,
    pub rejected: usize,
    pub errors: Vec<String>,
}

/// POST /api/imports/reject - Discard staged rows without conversion
pub async fn reject_staged(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RejectRequest>,
) -> Result<Json<RejectResponse>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;
    if req.ids.is_empty() {
        return Err(AppError::bad_request("No staged transaction ids provided"));
    }

    let mut rejected = 0;
    let mut errors = Vec::new();
    for id in &req.ids {
        match review::reject_staged(&state.db, &user_id, *id) {
            Ok(()) => rejected += 1,
            Err(e) => {
                warn!(staged_id = id, error = %e, "Rejection failed for staged row");
                errors.push(format!("{}: {}", id, e));
            }
        }
    }

    Ok(Json(RejectResponse {
        attempted: req.ids.len(),
        rejected,
        errors,
    }))
}

//! Account management handlers

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState};
use centime_core::models::Account;

/// Request body for creating an account
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
}

/// GET /api/accounts - List the caller's accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Account>>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;
    let accounts = state.db.list_accounts(&user_id)?;
    Ok(Json(accounts))
}

/// POST /api/accounts - Create an account (idempotent per name)
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;
    let account = state.db.upsert_account(&user_id, &req.name)?;
    Ok(Json(account))
}

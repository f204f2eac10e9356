//! Scheduled-trigger endpoints, guarded by a shared-secret bearer token.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use chrono::Utc;

use crate::api::AppState;
use crate::error::AppError;
use crate::orchestration::{CatalogError, CatalogSummary, RunSummary};

fn require_bearer(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;
    if presented != expected {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// POST /v1/signals/recompute
///
/// Run one signal batch anchored at the current wall clock and report the
/// same summary shape as the one-shot binary.
pub async fn recompute_signals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RunSummary>, AppError> {
    require_bearer(&headers, &state.config.recompute_token)?;
    let summary = state.runner.run(Utc::now()).await?;
    Ok(Json(summary))
}

/// POST /v1/catalog/sync
///
/// Refresh archive metadata and product match links. A catalog fetch
/// failure surfaces as an explicit 500 with its message.
pub async fn sync_catalog(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CatalogSummary>, AppError> {
    require_bearer(&headers, &state.config.recompute_token)?;
    match state.catalog.sync().await {
        Ok(summary) => Ok(Json(summary)),
        Err(e @ CatalogError::Fetch(_)) => Err(AppError::Internal(e.to_string())),
        Err(CatalogError::Db(e)) => Err(AppError::from(e)),
    }
}

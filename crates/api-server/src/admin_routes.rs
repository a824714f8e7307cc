use agri_store::CacheStats;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Serialize)]
pub struct ClearCacheResult {
    pub api_entries_removed: u64,
    pub forecasts_removed: u64,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/clear-cache", post(clear_cache))
        .route("/api/admin/cache-stats", get(cache_stats))
}

/// POST /api/admin/clear-cache
///
/// Drops cached API responses and forecasts. Price history is kept.
async fn clear_cache(State(state): State<AppState>) -> Result<Json<ApiResponse<ClearCacheResult>>, AppError> {
    let (api_entries_removed, forecasts_removed) = state.store.clear_caches().await?;
    tracing::info!(
        "Cache cleared: {} API responses, {} forecasts",
        api_entries_removed,
        forecasts_removed
    );

    let mut response = ApiResponse::success(ClearCacheResult {
        api_entries_removed,
        forecasts_removed,
    });
    response.message = Some("Cache cleared".to_string());
    Ok(Json(response))
}

/// GET /api/admin/cache-stats
async fn cache_stats(State(state): State<AppState>) -> Result<Json<CacheStats>, AppError> {
    Ok(Json(state.store.stats().await?))
}

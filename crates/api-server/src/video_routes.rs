use agmark_client::VideoItem;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct VideoRequest {
    #[serde(default)]
    pub crop: String,
}

#[derive(Serialize)]
pub struct VideoResults {
    pub videos: Vec<VideoItem>,
}

pub fn video_routes() -> Router<AppState> {
    Router::new().route("/api/videos/search", post(search_videos))
}

/// POST /api/videos/search
async fn search_videos(
    State(state): State<AppState>,
    Json(req): Json<VideoRequest>,
) -> Result<Json<ApiResponse<VideoResults>>, AppError> {
    let crop = req.crop.trim();
    if crop.is_empty() {
        return Err(AppError::bad_request("Crop name is required"));
    }
    let client = state
        .videos
        .as_ref()
        .ok_or_else(|| AppError::unavailable("Video search is not configured"))?;

    let videos = client.search_crop(crop).await;
    tracing::info!("Found {} videos for {}", videos.len(), crop);
    Ok(Json(ApiResponse::success(VideoResults { videos })))
}

use agmark_client::NewsArticle;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{upstream_message, ApiResponse, AppError, AppState};

#[derive(Serialize)]
pub struct NewsFeed {
    pub articles: Vec<NewsArticle>,
}

pub fn news_routes() -> Router<AppState> {
    Router::new().route("/api/news/fetch", get(fetch_news))
}

/// GET /api/news/fetch
async fn fetch_news(State(state): State<AppState>) -> Result<Json<ApiResponse<NewsFeed>>, AppError> {
    let client = state
        .news
        .as_ref()
        .ok_or_else(|| AppError::unavailable("News service is not configured"))?;

    match client.latest().await {
        Ok(articles) => {
            tracing::debug!("Fetched {} news articles", articles.len());
            Ok(Json(ApiResponse::success(NewsFeed { articles })))
        }
        Err(e) => {
            tracing::warn!("News fetch failed: {}", e);
            Ok(Json(ApiResponse::failure(upstream_message(&e))))
        }
    }
}

//! Farming Assistant Routes
//!
//! Text chat, crop image diagnosis, fertilizer plans and monthly tips, all answered by
//! the configured assistant backend.

use assistant_client::decode_data_url;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
pub struct ImageChatRequest {
    pub message: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize)]
pub struct FertilizerRequest {
    #[serde(default)]
    pub crop: String,
    pub soil_type: Option<String>,
    pub growth_stage: Option<String>,
}

#[derive(Serialize)]
pub struct AssistantReply {
    pub response: String,
}

#[derive(Serialize)]
pub struct QuickTips {
    pub response: String,
    pub month: String,
}

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat/image", post(chat_with_image))
        .route("/api/fertilizer", post(fertilizer))
        .route("/api/quick-tips", get(quick_tips))
}

/// Blank optional text is treated as absent
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// POST /api/chat
async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ApiResponse<AssistantReply>>, AppError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::bad_request("No message provided"));
    }

    let response = state.assistant.ask(message).await.map_err(AppError::from_assistant)?;
    Ok(Json(ApiResponse::success(AssistantReply { response })))
}

/// POST /api/chat/image
async fn chat_with_image(
    State(state): State<AppState>,
    Json(req): Json<ImageChatRequest>,
) -> Result<Json<ApiResponse<AssistantReply>>, AppError> {
    let data_url = non_blank(&req.image).ok_or_else(|| AppError::bad_request("No image provided"))?;
    let image = decode_data_url(data_url).map_err(AppError::from_assistant)?;

    tracing::info!("Diagnosing {} image ({} bytes)", image.mime_type, image.bytes.len());
    let response = state
        .assistant
        .diagnose_image(non_blank(&req.message), &image)
        .await
        .map_err(AppError::from_assistant)?;
    Ok(Json(ApiResponse::success(AssistantReply { response })))
}

/// POST /api/fertilizer
async fn fertilizer(
    State(state): State<AppState>,
    Json(req): Json<FertilizerRequest>,
) -> Result<Json<ApiResponse<AssistantReply>>, AppError> {
    let crop = req.crop.trim();
    if crop.is_empty() {
        return Err(AppError::bad_request("Crop name is required"));
    }

    let response = state
        .assistant
        .fertilizer_plan(crop, non_blank(&req.soil_type), non_blank(&req.growth_stage))
        .await
        .map_err(AppError::from_assistant)?;
    Ok(Json(ApiResponse::success(AssistantReply { response })))
}

/// GET /api/quick-tips
async fn quick_tips(State(state): State<AppState>) -> Result<Json<ApiResponse<QuickTips>>, AppError> {
    let month = Local::now().format("%B").to_string();
    let response = state.assistant.quick_tips(&month).await.map_err(AppError::from_assistant)?;
    Ok(Json(ApiResponse::success(QuickTips { response, month })))
}

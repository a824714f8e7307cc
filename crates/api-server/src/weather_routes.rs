use agmark_client::{DailyWeather, WeatherClient, WeatherLocation};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{upstream_message, ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct WeatherRequest {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub location: String,
}

fn default_kind() -> String {
    "city".to_string()
}

#[derive(Serialize)]
pub struct CurrentWeather {
    pub data: serde_json::Value,
}

#[derive(Serialize)]
pub struct WeatherForecast {
    pub forecast: Vec<DailyWeather>,
}

pub fn weather_routes() -> Router<AppState> {
    Router::new()
        .route("/api/weather/current", post(current_weather))
        .route("/api/weather/forecast", post(weather_forecast))
}

fn resolve(state: &AppState, req: &WeatherRequest) -> Result<(WeatherClient, WeatherLocation), AppError> {
    let client = state
        .weather
        .clone()
        .ok_or_else(|| AppError::unavailable("Weather service is not configured"))?;
    if req.location.trim().is_empty() {
        return Err(AppError::bad_request("Location is required"));
    }
    Ok((client, WeatherLocation::from_request(&req.kind, &req.location)))
}

/// POST /api/weather/current
async fn current_weather(
    State(state): State<AppState>,
    Json(req): Json<WeatherRequest>,
) -> Result<Json<ApiResponse<CurrentWeather>>, AppError> {
    let (client, location) = resolve(&state, &req)?;
    match client.current(&location).await {
        Ok(data) => Ok(Json(ApiResponse::success(CurrentWeather { data }))),
        Err(e) => {
            tracing::warn!("Current weather for {:?} failed: {}", location, e);
            Ok(Json(ApiResponse::failure(upstream_message(&e))))
        }
    }
}

/// POST /api/weather/forecast
async fn weather_forecast(
    State(state): State<AppState>,
    Json(req): Json<WeatherRequest>,
) -> Result<Json<ApiResponse<WeatherForecast>>, AppError> {
    let (client, location) = resolve(&state, &req)?;
    match client.daily_forecast(&location).await {
        Ok(forecast) => Ok(Json(ApiResponse::success(WeatherForecast { forecast }))),
        Err(e) => {
            tracing::warn!("Weather forecast for {:?} failed: {}", location, e);
            Ok(Json(ApiResponse::failure(upstream_message(&e))))
        }
    }
}

//! Price forecast route.
//!
//! Forecast cache, then price feed (falling back to stored history), then the
//! forecasting pipeline on a blocking thread.

use agri_core::{Forecast, PriceQuery, RawPriceRecord};
use axum::{extract::State, routing::post, Json, Router};
use chrono::NaiveDate;
use price_forecast::{prepare, ForecastError, ForecastResult, MIN_SERIES_LEN, WINDOW_DAYS};
use serde::Deserialize;

use crate::gateway::{load_history_records, persist_history_in_background};
use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct ForecastRequest {
    #[serde(default)]
    pub commodity: String,
    #[serde(default)]
    pub district: String,
    pub target_date: Option<String>,
}

pub fn forecast_routes() -> Router<AppState> {
    Router::new().route("/api/forecasting/predict-specific-date", post(predict_specific_date))
}

/// User-facing message for a pipeline failure
fn failure_message(err: &ForecastError) -> String {
    match err {
        ForecastError::InsufficientData { found, required } => format!(
            "Unable to prepare data for forecasting. Valid records: {}. Need at least {}.",
            found, required
        ),
        ForecastError::ModelFit { .. } => "Forecasting model failed to generate predictions".to_string(),
        ForecastError::NonPositiveHorizon { target, last } => format!(
            "Target date {} must be after the last available price date {}",
            target, last
        ),
        ForecastError::PredictionUnavailable(date) => format!("No prediction available for {}", date),
    }
}

async fn cached_forecast(
    state: &AppState,
    district: &str,
    commodity: &str,
    target: NaiveDate,
) -> Option<Forecast> {
    let region = &state.config.default_state;
    match state.store.get_forecast(region, district, commodity, target).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                tracing::warn!("Discarding unreadable cached forecast: {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Forecast cache read failed, treating as miss: {}", e);
            None
        }
    }
}

/// Price records for the forecast: live feed first, stored history when the feed is empty
async fn historical_records(state: &AppState, district: &str, commodity: &str) -> Vec<RawPriceRecord> {
    let region = state.config.default_state.clone();
    let query = PriceQuery::for_state(&region)
        .district(district)
        .commodity(commodity)
        .newest_first();
    let records = state.prices.fetch(&query).await;

    if !records.is_empty() {
        persist_history_in_background(
            state.store.clone(),
            records.clone(),
            region,
            district.to_string(),
            commodity.to_string(),
        );
        return records;
    }

    let stored = load_history_records(&state.store, &region, district, commodity, WINDOW_DAYS).await;
    tracing::info!(
        "Price feed returned nothing for {} / {}, using {} stored records",
        district,
        commodity,
        stored.len()
    );
    stored
}

/// POST /api/forecasting/predict-specific-date
async fn predict_specific_date(
    State(state): State<AppState>,
    Json(req): Json<ForecastRequest>,
) -> Result<Json<ApiResponse<Forecast>>, AppError> {
    let raw_target = req
        .target_date
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request("Target date is required"))?;
    let target = NaiveDate::parse_from_str(raw_target, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("Invalid target date, expected YYYY-MM-DD"))?;

    let district = req.district.trim().to_string();
    let commodity = req.commodity.trim().to_string();
    if district.is_empty() || commodity.is_empty() {
        return Err(AppError::bad_request("Commodity and district are required"));
    }

    if let Some(forecast) = cached_forecast(&state, &district, &commodity, target).await {
        tracing::debug!("Forecast cache hit for {} / {} on {}", district, commodity, target);
        return Ok(Json(ApiResponse::success(forecast)));
    }

    let records = historical_records(&state, &district, &commodity).await;
    if records.len() < MIN_SERIES_LEN {
        return Ok(Json(ApiResponse::failure(format!(
            "Insufficient historical data for forecasting. Found only {} records. Need at least {} records.",
            records.len(),
            MIN_SERIES_LEN
        ))));
    }

    let engine = state.forecaster.clone();
    let outcome = tokio::task::spawn_blocking(move || -> ForecastResult<Forecast> {
        let preparation = prepare(&records);
        if !preparation.discarded.is_empty() {
            tracing::debug!(
                "Discarded {} of {} records while preparing the series",
                preparation.discarded.len(),
                records.len()
            );
        }
        let series = preparation.into_series()?;
        engine.forecast(&series, target)
    })
    .await?;

    let forecast = match outcome {
        Ok(forecast) => forecast,
        Err(e) => {
            tracing::warn!("Forecast for {} / {} on {} failed: {}", district, commodity, target, e);
            return Ok(Json(ApiResponse::failure(failure_message(&e))));
        }
    };

    tracing::info!(
        "Forecast {} / {} on {}: {:.2} ({} model)",
        district,
        commodity,
        target,
        forecast.predicted_price,
        forecast.model
    );

    match serde_json::to_value(&forecast) {
        Ok(value) => {
            if let Err(e) = state
                .store
                .put_forecast(
                    &state.config.default_state,
                    &district,
                    &commodity,
                    target,
                    &value,
                    state.config.forecast_cache_ttl,
                )
                .await
            {
                tracing::warn!("Forecast cache write failed: {}", e);
            }
        }
        Err(e) => tracing::warn!("Could not serialise forecast for cache: {}", e),
    }

    Ok(Json(ApiResponse::success(forecast)))
}

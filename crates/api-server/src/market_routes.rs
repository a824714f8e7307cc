//! Market Price Routes
//!
//! Mandi price lookups for the configured state: filter options, recent arrival dates
//! with per-date averages, and multi-day record listings.

use agmark_client::{distinct_values, recent_arrival_dates};
use agri_core::stats::{price_averages, PriceAverages};
use agri_core::{PriceQuery, RawPriceRecord, ARRIVAL_DATE_FORMAT};
use axum::{extract::State, routing::{get, post}, Json, Router};
use chrono::{Duration, Local, NaiveDate};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

/// Dates shown on the recent-dates view
const RECENT_DATE_COUNT: usize = 5;
/// Records returned per date on the recent-dates view
const RECORDS_PER_DATE: usize = 20;
const LAST_DAYS: i64 = 10;

#[derive(Deserialize)]
pub struct MarketRequest {
    #[serde(default)]
    pub commodity: String,
    #[serde(default)]
    pub district: String,
}

#[derive(Deserialize)]
pub struct CommodityRequest {
    #[serde(default)]
    pub commodity: String,
}

#[derive(Serialize)]
pub struct MarketOptions {
    pub commodities: Vec<String>,
    pub districts: Vec<String>,
}

#[derive(Serialize)]
pub struct DateData {
    pub date: NaiveDate,
    pub date_formatted: String,
    pub prices: PriceAverages,
    pub records: Vec<RawPriceRecord>,
}

#[derive(Serialize)]
pub struct RecentDates {
    pub dates_data: Vec<DateData>,
}

#[derive(Serialize)]
pub struct RecordList {
    pub records: Vec<RawPriceRecord>,
}

pub fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/api/market/options", get(market_options))
        .route("/api/market/recent-dates-data", post(recent_dates_data))
        .route("/api/market/last-10-days", post(last_ten_days))
        .route("/api/market/all-districts", post(all_districts))
}

fn require(value: &str, what: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::bad_request(format!("{} is required", what)));
    }
    Ok(value.to_string())
}

/// GET /api/market/options
async fn market_options(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MarketOptions>>, AppError> {
    let records = state
        .prices
        .fetch(&PriceQuery::for_state(&state.config.default_state))
        .await;

    Ok(Json(ApiResponse::success(MarketOptions {
        commodities: distinct_values(&records, |r| r.commodity.as_deref()),
        districts: distinct_values(&records, |r| r.district.as_deref()),
    })))
}

/// POST /api/market/recent-dates-data
async fn recent_dates_data(
    State(state): State<AppState>,
    Json(req): Json<MarketRequest>,
) -> Result<Json<ApiResponse<RecentDates>>, AppError> {
    let commodity = require(&req.commodity, "Commodity")?;
    let district = require(&req.district, "District")?;

    let base = PriceQuery::for_state(&state.config.default_state)
        .district(&district)
        .commodity(&commodity)
        .newest_first();

    let all = state.prices.fetch(&base).await;
    let dates = recent_arrival_dates(&all, RECENT_DATE_COUNT);
    if dates.is_empty() {
        return Ok(Json(ApiResponse::failure("No recent dates found")));
    }

    let per_date = join_all(dates.iter().map(|date| {
        let query = base.clone().on_date(*date);
        let prices = state.prices.clone();
        async move { prices.fetch(&query).await }
    }))
    .await;

    let dates_data = dates
        .into_iter()
        .zip(per_date)
        .filter(|(_, records)| !records.is_empty())
        .map(|(date, mut records)| {
            let prices = price_averages(&records);
            records.truncate(RECORDS_PER_DATE);
            DateData {
                date,
                date_formatted: date.format(ARRIVAL_DATE_FORMAT).to_string(),
                prices,
                records,
            }
        })
        .collect();

    tracing::info!("Recent dates for {} / {} served", district, commodity);
    Ok(Json(ApiResponse::success(RecentDates { dates_data })))
}

/// Records for each of the last ten calendar days, newest first. When none of those days
/// has data the ten newest records on file are returned instead.
async fn last_days_records(state: &AppState, base: PriceQuery) -> Vec<RawPriceRecord> {
    let today = Local::now().date_naive();
    let days: Vec<NaiveDate> = (0..LAST_DAYS).map(|i| today - Duration::days(i)).collect();

    let per_day = join_all(days.iter().map(|date| {
        let query = base.clone().on_date(*date);
        let prices = state.prices.clone();
        async move { prices.fetch(&query).await }
    }))
    .await;

    let records: Vec<RawPriceRecord> = per_day.into_iter().flatten().collect();
    if !records.is_empty() {
        return records;
    }

    tracing::debug!("No records in the last {} days, using newest available", LAST_DAYS);
    state
        .prices
        .fetch(&base.newest_first().limit(LAST_DAYS as u32))
        .await
}

/// POST /api/market/last-10-days
async fn last_ten_days(
    State(state): State<AppState>,
    Json(req): Json<MarketRequest>,
) -> Result<Json<ApiResponse<RecordList>>, AppError> {
    let commodity = require(&req.commodity, "Commodity")?;
    let district = require(&req.district, "District")?;

    let base = PriceQuery::for_state(&state.config.default_state)
        .district(district)
        .commodity(commodity);
    let records = last_days_records(&state, base).await;

    Ok(Json(ApiResponse::success(RecordList { records })))
}

/// POST /api/market/all-districts
async fn all_districts(
    State(state): State<AppState>,
    Json(req): Json<CommodityRequest>,
) -> Result<Json<ApiResponse<RecordList>>, AppError> {
    let commodity = require(&req.commodity, "Commodity")?;

    let base = PriceQuery::for_state(&state.config.default_state).commodity(commodity);
    let records = last_days_records(&state, base).await;

    Ok(Json(ApiResponse::success(RecordList { records })))
}

pub mod admin_routes;
pub mod chat_routes;
pub mod config;
pub mod forecast_routes;
pub mod gateway;
pub mod market_routes;
pub mod news_routes;
pub mod request_id;
pub mod security_headers;
pub mod video_routes;
pub mod weather_routes;
#[cfg(test)]
mod tests;

use agmark_client::{AgmarkClient, NewsClient, VideoClient, WeatherClient};
use agri_core::{AgriError, PriceRecordSource};
use agri_store::AgriStore;
use anyhow::Context;
use assistant_client::{AssistantConfig, AssistantError, AssistantProvider, GeminiClient};
use axum::{
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use price_forecast::ForecastEngine;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use gateway::PriceGateway;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: AgriStore,
    pub prices: PriceGateway,
    pub weather: Option<WeatherClient>,
    pub news: Option<NewsClient>,
    pub videos: Option<VideoClient>,
    pub assistant: Arc<dyn AssistantProvider>,
    pub forecaster: ForecastEngine,
}

impl AppState {
    /// Wire every client from configuration
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store = AgriStore::new(&config.database_url)
            .await
            .with_context(|| format!("opening {}", config.database_url))?;

        let source: Arc<dyn PriceRecordSource> = Arc::new(AgmarkClient::new(
            config.agmark_api_key.clone(),
            config.agmark_api_url.clone(),
            config.agmark_rate_limit,
        ));
        let assistant: Arc<dyn AssistantProvider> = Arc::new(GeminiClient::new(&AssistantConfig {
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            ..AssistantConfig::default()
        }));

        Ok(Self::from_parts(config, store, source, assistant))
    }

    /// Assemble state around an existing store, price source and assistant
    pub fn from_parts(
        config: AppConfig,
        store: AgriStore,
        source: Arc<dyn PriceRecordSource>,
        assistant: Arc<dyn AssistantProvider>,
    ) -> Self {
        let forecaster = match config.forecast_seed {
            Some(seed) => ForecastEngine::with_seed(seed),
            None => ForecastEngine::new(),
        };

        Self {
            prices: PriceGateway::new(source, store.clone(), config.api_cache_ttl),
            weather: config.weather_api_key.clone().map(WeatherClient::new),
            news: config.news_api_key.clone().map(NewsClient::new),
            videos: config.youtube_api_key.clone().map(VideoClient::new),
            store,
            assistant,
            forecaster,
            config: Arc::new(config),
        }
    }
}

/// JSON envelope: `success` plus the payload's fields, or a `message` on soft failure
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// A handled failure reported with HTTP 200
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Error response: `{success: false, error}` with a 4xx/5xx status
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        tracing::error!("Request failed: {:#}", err);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl AppError {
    /// Missing key maps to 503, bad input to 400, anything else to 500
    pub fn from_assistant(err: AssistantError) -> Self {
        match err {
            AssistantError::NotConfigured(msg) => AppError::unavailable(msg),
            e if e.is_client_error() => AppError::bad_request(e.to_string()),
            e => e.into(),
        }
    }
}

/// Message shown to the client for an upstream failure
pub(crate) fn upstream_message(err: &AgriError) -> String {
    match err {
        AgriError::ApiError(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .merge(market_routes::market_routes())
        .merge(forecast_routes::forecast_routes())
        .merge(weather_routes::weather_routes())
        .merge(news_routes::news_routes())
        .merge(video_routes::video_routes())
        .merge(chat_routes::chat_routes())
        .merge(admin_routes::admin_routes())
        .with_state(state)
        .layer(middleware::from_fn(security_headers::security_headers_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting farm market server for {}", config.default_state);
    tracing::info!("  Database: {}", config.database_url);
    tracing::info!(
        "  Weather: {}, news: {}, videos: {}, assistant: {}",
        config.weather_api_key.is_some(),
        config.news_api_key.is_some(),
        config.youtube_api_key.is_some(),
        config.gemini_api_key.is_some()
    );
    if let Some(seed) = config.forecast_seed {
        tracing::info!("  Forecast seed: {}", seed);
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config).await?;

    if let Err(e) = state.store.purge_expired().await {
        tracing::warn!("Cache purge failed: {}", e);
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

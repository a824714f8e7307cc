#[cfg(test)]
mod router_tests {
    use crate::{build_router, AppConfig, AppState};
    use agri_core::{AgriError, PriceObservation, PriceQuery, PriceRecordSource, RawPriceRecord};
    use agri_store::AgriStore;
    use assistant_client::{AssistantError, AssistantProvider, AssistantResult, InlineImage};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use chrono::{Duration, Local, NaiveDate};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    /// Serves fixed records, honouring the arrival date filter, or fails every call
    struct CannedSource {
        records: Vec<RawPriceRecord>,
        missing_date: Option<NaiveDate>,
        calls: AtomicUsize,
        queries: Mutex<Vec<PriceQuery>>,
    }

    impl CannedSource {
        fn new(records: Vec<RawPriceRecord>) -> Arc<Self> {
            Arc::new(Self {
                records,
                missing_date: None,
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn unreachable() -> Arc<Self> {
            Self::new(Vec::new())
        }

        /// Like `new`, but a query pinned to `date` comes back empty
        fn missing(records: Vec<RawPriceRecord>, date: NaiveDate) -> Arc<Self> {
            Arc::new(Self {
                records,
                missing_date: Some(date),
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<PriceQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceRecordSource for CannedSource {
        async fn fetch_records(&self, query: &PriceQuery) -> Result<Vec<RawPriceRecord>, AgriError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            if self.records.is_empty() {
                return Err(AgriError::ApiError("connection refused".to_string()));
            }
            if query.arrival_date.is_some() && query.arrival_date == self.missing_date {
                return Ok(Vec::new());
            }
            Ok(self
                .records
                .iter()
                .filter(|r| query.arrival_date.map_or(true, |d| r.parsed_date() == Some(d)))
                .cloned()
                .collect())
        }

        fn source_name(&self) -> &'static str {
            "canned"
        }
    }

    struct EchoAssistant;

    #[async_trait]
    impl AssistantProvider for EchoAssistant {
        async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> AssistantResult<String> {
            Ok(format!("echo:{}:{}", image.map_or("none", |i| i.mime_type), prompt.len()))
        }

        fn backend_name(&self) -> &'static str {
            "echo"
        }
    }

    struct OfflineAssistant;

    #[async_trait]
    impl AssistantProvider for OfflineAssistant {
        async fn generate(&self, _prompt: &str, _image: Option<&InlineImage>) -> AssistantResult<String> {
            Err(AssistantError::NotConfigured("GEMINI_API_KEY is not set".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "offline"
        }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// `n` daily records ending yesterday, modal price rising by one per day
    fn daily_records(n: i64) -> Vec<RawPriceRecord> {
        (0..n)
            .map(|i| {
                let date = today() - Duration::days(n - i);
                RawPriceRecord {
                    state: Some("Maharashtra".to_string()),
                    district: Some("Pune".to_string()),
                    market: Some("Pune APMC".to_string()),
                    commodity: Some("Onion".to_string()),
                    arrival_date: Some(date.format("%d/%m/%Y").to_string()),
                    min_price: Some(format!("{}", 90 + i)),
                    max_price: Some(format!("{}", 110 + i)),
                    modal_price: Some(format!("{}", 100 + i)),
                    ..Default::default()
                }
            })
            .collect()
    }

    async fn app_with(source: Arc<CannedSource>, assistant: Arc<dyn AssistantProvider>) -> (Router, AgriStore) {
        let config = AppConfig {
            forecast_seed: Some(7),
            ..AppConfig::default()
        };
        let store = AgriStore::new("sqlite::memory:").await.unwrap();
        let state = AppState::from_parts(config, store.clone(), source, assistant);
        (build_router(state), store)
    }

    async fn app(source: Arc<CannedSource>) -> (Router, AgriStore) {
        app_with(source, Arc::new(EchoAssistant)).await
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    fn forecast_body(target: NaiveDate) -> Value {
        json!({
            "commodity": "Onion",
            "district": "Pune",
            "target_date": target.format("%Y-%m-%d").to_string(),
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(CannedSource::unreachable()).await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let (app, _) = app(CannedSource::unreachable()).await;
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "trace-42")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "trace-42");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_forecast_succeeds_and_is_cached() {
        let source = CannedSource::new(daily_records(40));
        let (app, store) = app(source.clone()).await;
        let target = today() + Duration::days(5);

        let (status, body) = send(&app, "POST", "/api/forecasting/predict-specific-date", Some(forecast_body(target))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true, "{}", body);
        assert_eq!(body["current_price"], 139.0);
        assert_eq!(body["historical"].as_array().unwrap().len(), 40);

        let path = body["forecast"].as_array().unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(path[5]["date"], target.format("%Y-%m-%d").to_string());
        let predicted = body["predicted_price"].as_f64().unwrap();
        assert!(predicted >= 0.7 * 139.0 - 1e-9 && predicted <= 1.3 * 139.0 + 1e-9);

        assert_eq!(store.stats().await.unwrap().forecast_cache_count, 1);

        // Second request is answered from the forecast cache without touching the feed
        let calls = source.calls.load(Ordering::SeqCst);
        let (_, again) = send(&app, "POST", "/api/forecasting/predict-specific-date", Some(forecast_body(target))).await;
        assert_eq!(again, body);
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_forecast_insufficient_records() {
        let (app, _) = app(CannedSource::unreachable()).await;
        let target = today() + Duration::days(3);

        let (status, body) = send(&app, "POST", "/api/forecasting/predict-specific-date", Some(forecast_body(target))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Insufficient historical data for forecasting. Found only 0 records. Need at least 30 records."
        );
    }

    #[tokio::test]
    async fn test_forecast_falls_back_to_stored_history() {
        let (app, store) = app(CannedSource::unreachable()).await;
        let observations: Vec<PriceObservation> = daily_records(35)
            .iter()
            .filter_map(|r| PriceObservation::from_raw(r, "Maharashtra", "Pune", "Onion"))
            .collect();
        assert_eq!(store.upsert_observations(&observations).await.unwrap(), 35);

        let target = today() + Duration::days(2);
        let (_, body) = send(&app, "POST", "/api/forecasting/predict-specific-date", Some(forecast_body(target))).await;
        assert_eq!(body["success"], true, "{}", body);
        assert_eq!(body["historical"].as_array().unwrap().len(), 35);
        assert_eq!(body["forecast"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_forecast_rejects_bad_target_date() {
        let (app, _) = app(CannedSource::unreachable()).await;
        let body = json!({"commodity": "Onion", "district": "Pune", "target_date": "15/08/2025"});

        let (status, body) = send(&app, "POST", "/api/forecasting/predict-specific-date", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn test_forecast_target_before_last_observation() {
        let (app, _) = app(CannedSource::new(daily_records(40))).await;
        let target = today() - Duration::days(10);

        let (_, body) = send(&app, "POST", "/api/forecasting/predict-specific-date", Some(forecast_body(target))).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("must be after"));
    }

    #[tokio::test]
    async fn test_market_options_and_recent_dates() {
        let (app, _) = app(CannedSource::new(daily_records(40))).await;

        let (_, options) = send(&app, "GET", "/api/market/options", None).await;
        assert_eq!(options["success"], true);
        assert_eq!(options["commodities"], json!(["Onion"]));
        assert_eq!(options["districts"], json!(["Pune"]));

        let (_, recent) = send(
            &app,
            "POST",
            "/api/market/recent-dates-data",
            Some(json!({"commodity": "Onion", "district": "Pune"})),
        )
        .await;
        let dates = recent["dates_data"].as_array().unwrap();
        assert_eq!(dates.len(), 5);
        let yesterday = today() - Duration::days(1);
        assert_eq!(dates[0]["date_formatted"], yesterday.format("%d/%m/%Y").to_string());
        assert_eq!(dates[0]["prices"]["modal_avg"], 139.0);
        assert_eq!(dates[0]["records"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_price_queries_ask_for_newest_first() {
        let source = CannedSource::new(daily_records(40));
        let (app, _) = app(source.clone()).await;

        let (_, forecast) = send(
            &app,
            "POST",
            "/api/forecasting/predict-specific-date",
            Some(forecast_body(today() + Duration::days(3))),
        )
        .await;
        assert_eq!(forecast["success"], true);
        send(
            &app,
            "POST",
            "/api/market/recent-dates-data",
            Some(json!({"commodity": "Onion", "district": "Pune"})),
        )
        .await;

        let queries = source.queries();
        assert!(!queries.is_empty());
        for query in &queries {
            assert!(query.newest_first, "{:?} not sorted newest first", query);
            assert_eq!(query.district.as_deref(), Some("Pune"));
        }
    }

    #[tokio::test]
    async fn test_recent_dates_skip_days_without_records() {
        let gap = today() - Duration::days(2);
        let (app, _) = app(CannedSource::missing(daily_records(40), gap)).await;

        let (_, recent) = send(
            &app,
            "POST",
            "/api/market/recent-dates-data",
            Some(json!({"commodity": "Onion", "district": "Pune"})),
        )
        .await;
        assert_eq!(recent["success"], true);
        let dates = recent["dates_data"].as_array().unwrap();
        assert_eq!(dates.len(), 4);
        let gap_formatted = gap.format("%d/%m/%Y").to_string();
        assert!(dates.iter().all(|d| d["date_formatted"] != gap_formatted.as_str()));
        assert!(dates.iter().all(|d| !d["prices"]["modal_avg"].is_null()));
    }

    #[tokio::test]
    async fn test_recent_dates_without_data() {
        let (app, _) = app(CannedSource::unreachable()).await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/market/recent-dates-data",
            Some(json!({"commodity": "Onion", "district": "Pune"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No recent dates found");
    }

    #[tokio::test]
    async fn test_last_ten_days_collects_each_day() {
        let (app, _) = app(CannedSource::new(daily_records(40))).await;
        let (_, body) = send(
            &app,
            "POST",
            "/api/market/last-10-days",
            Some(json!({"commodity": "Onion", "district": "Pune"})),
        )
        .await;
        // Today has no record; the nine days before it each have one
        assert_eq!(body["records"].as_array().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_chat_validation() {
        let (app, _) = app(CannedSource::unreachable()).await;

        let (status, body) = send(&app, "POST", "/api/chat", Some(json!({"message": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No message provided");

        let (status, body) = send(&app, "POST", "/api/chat/image", Some(json!({"message": "what is this"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image provided");

        let (status, body) = send(
            &app,
            "POST",
            "/api/chat/image",
            Some(json!({"image": "data:image/png;base64,not base64!!"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid image format"));

        let (status, body) = send(&app, "POST", "/api/fertilizer", Some(json!({"crop": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Crop name is required");
    }

    #[tokio::test]
    async fn test_chat_and_image_replies() {
        let (app, _) = app(CannedSource::unreachable()).await;

        let (_, body) = send(&app, "POST", "/api/chat", Some(json!({"message": "When to sow wheat?"}))).await;
        assert_eq!(body["success"], true);
        assert!(body["response"].as_str().unwrap().starts_with("echo:none:"));

        // 1x1 GIF
        let gif = "data:image/gif;base64,R0lGODlhAQABAAAAACw=";
        let (_, body) = send(&app, "POST", "/api/chat/image", Some(json!({"image": gif}))).await;
        assert_eq!(body["success"], true, "{}", body);
        assert!(body["response"].as_str().unwrap().starts_with("echo:image/gif:"));

        let (_, body) = send(&app, "GET", "/api/quick-tips", None).await;
        assert_eq!(body["month"], Local::now().format("%B").to_string());
    }

    #[tokio::test]
    async fn test_unconfigured_services_return_503() {
        let (app, _) = app_with(CannedSource::unreachable(), Arc::new(OfflineAssistant)).await;

        let (status, _) = send(&app, "POST", "/api/chat", Some(json!({"message": "hello"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let weather = json!({"type": "city", "location": "Pune"});
        let (status, body) = send(&app, "POST", "/api/weather/current", Some(weather)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, "GET", "/api/news/fetch", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = send(&app, "POST", "/api/videos/search", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Crop name is required");
    }

    #[tokio::test]
    async fn test_cache_stats_and_clear() {
        let (app, store) = app(CannedSource::new(daily_records(40))).await;
        send(&app, "GET", "/api/market/options", None).await;

        let (_, stats) = send(&app, "GET", "/api/admin/cache-stats", None).await;
        assert_eq!(stats["api_cache_count"], 1);
        assert_eq!(stats["forecast_cache_count"], 0);

        let (_, cleared) = send(&app, "POST", "/api/admin/clear-cache", None).await;
        assert_eq!(cleared["success"], true);
        assert_eq!(cleared["message"], "Cache cleared");
        assert_eq!(store.stats().await.unwrap().api_cache_count, 0);
    }
}

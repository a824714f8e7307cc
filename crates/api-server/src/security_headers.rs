use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Hardening headers for a JSON-only API
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_api = request.uri().path().starts_with("/api/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));

    // Prices and forecasts are cached server-side; clients always revalidate
    if is_api {
        headers.insert("cache-control", HeaderValue::from_static("no-store"));
    }

    response
}

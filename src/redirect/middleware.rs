use axum::{body::Body, http::HeaderValue, http::Request, middleware::Next, response::Response};
use std::time::Instant;

pub const TIMING_HEADER: &str = "x-clickvault-timing-ms";

/// Stamp the response with the time spent handling the request
pub async fn record_timing(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&start.elapsed().as_millis().to_string()) {
        response.headers_mut().insert(TIMING_HEADER, value);
    }

    response
}

// HTTP middleware
// Author: kelexine (https://github.com/kelexine)

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Response header naming the strategy that served a fetch.
pub const STRATEGY_HEADER: &str = "x-sw-strategy";
/// Response header naming where the response came from.
pub const SOURCE_HEADER: &str = "x-sw-source";

/// Create request ID layers for the application
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
        PropagateRequestIdLayer::x_request_id(),
    )
}

/// Record per-request metrics, labelled from the strategy headers the fetch
/// handler sets. Control-plane requests carry no strategy header.
pub async fn record_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let label = |name: &str, default: &'static str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(default)
            .to_string()
    };
    let strategy = label(STRATEGY_HEADER, "control");
    let source = label(SOURCE_HEADER, "none");

    crate::metrics::record_request(
        &method,
        response.status().as_u16(),
        &strategy,
        &source,
        started.elapsed().as_secs_f64(),
    );
    response
}

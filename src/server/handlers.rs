// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::middleware::{SOURCE_HEADER, STRATEGY_HEADER};
use super::routes::AppState;
use crate::cache::CacheStats;
use crate::config::AppConfig;
use crate::error::{Result, WorkerError};
use crate::models::{Request, RequestMode, WorkerMessage};
use crate::utils::logging::redact;
use crate::worker::{RegisterOutcome, Served};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::Url;

/// Largest request body forwarded upstream.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

impl HealthCheck {
    fn new(status: &str, message: String) -> Self {
        Self {
            status: status.to_string(),
            message,
        }
    }
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    // Active generation
    let active_check = match state.registration.active() {
        Some(active) => HealthCheck::new(
            "ok",
            format!("Generation {} ({})", active.version(), active.state()),
        ),
        None => {
            overall_status = HealthStatus::Degraded;
            HealthCheck::new(
                "warning",
                "No active generation, requests pass through to the network".to_string(),
            )
        }
    };
    checks.insert("active_generation".to_string(), active_check);

    // Waiting generation
    let waiting_check = match state.registration.waiting() {
        Some(waiting) => HealthCheck::new(
            "ok",
            format!("Generation {} waiting for SKIP_WAITING", waiting.version()),
        ),
        None => HealthCheck::new("ok", "None".to_string()),
    };
    checks.insert("waiting_generation".to_string(), waiting_check);

    // Cache storage
    let storage_check = match state.registration.platform().cache_stats().await {
        Ok(stats) => HealthCheck::new(
            "ok",
            format!(
                "{} partition(s), {} entries",
                stats.partitions.len(),
                stats.total_entries()
            ),
        ),
        Err(e) => {
            overall_status = HealthStatus::Unhealthy;
            HealthCheck::new("error", e.to_string())
        }
    };
    checks.insert("cache_storage".to_string(), storage_check);

    // Check configuration
    let config_check = HealthCheck::new(
        "ok",
        format!("Upstream origin: {}", state.config.upstream.origin),
    );
    checks.insert("configuration".to_string(), config_check);

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Handler for /__sw/caches - partition names with entry counts
pub async fn caches_handler(State(state): State<AppState>) -> Result<Json<CacheStats>> {
    let stats = state.registration.platform().cache_stats().await?;
    Ok(Json(stats))
}

/// Handler for /__sw/metrics - Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Version activated by the message, if any.
    pub activated: Option<String>,
}

/// Handler for /__sw/message - the host page's message interface
pub async fn message_handler(
    State(state): State<AppState>,
    Json(message): Json<WorkerMessage>,
) -> Result<Json<MessageResponse>> {
    info!("Received message: {:?}", message);
    let activated = state.registration.post_message(message).await?;
    Ok(Json(MessageResponse { activated }))
}

/// Handler for /__sw/update - reload configuration and register its generation
pub async fn update_handler(State(state): State<AppState>) -> Result<Json<RegisterOutcome>> {
    let config = AppConfig::load(state.config_path.as_deref())?;
    if config.scope_url()? != *state.registration.scope() {
        warn!("upstream.origin changed; the new origin applies after a restart");
    }

    info!("Registering generation {}", config.worker.version);
    let outcome = state.registration.register(config.worker).await?;
    Ok(Json(outcome))
}

/// Fallback handler: every other request is a fetch event
pub async fn fetch_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Response {
    let request = match into_fetch_request(state.registration.scope(), request).await {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    debug!("Fetch event: {} {}", request.method, redact(request.key()));
    match state.registration.handle_fetch(request).await {
        Ok(served) => served_response(served),
        Err(e) => e.into_response(),
    }
}

/// Turn an incoming proxy request into a fetch event.
async fn into_fetch_request(scope: &Url, request: axum::extract::Request) -> Result<Request> {
    let (parts, body) = request.into_parts();
    let url = resolve_url(scope, &parts.uri)?;
    let mode = request_mode(&parts.method, &parts.headers, parts.uri.scheme().is_some());
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| WorkerError::InvalidRequest(format!("unreadable request body: {}", e)))?;

    Ok(Request::get(url)
        .with_method(parts.method)
        .with_mode(mode)
        .with_headers(parts.headers)
        .with_body(body))
}

/// Absolute-form URIs are fetched as-is; origin-form paths resolve under the
/// scope, so the proxy root maps to the scope root.
pub(crate) fn resolve_url(scope: &Url, uri: &Uri) -> Result<Url> {
    if uri.scheme().is_some() {
        return Ok(Url::parse(&uri.to_string())?);
    }
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let relative = format!("./{}", path_and_query.trim_start_matches('/'));
    Ok(scope.join(&relative)?)
}

/// Fetch mode from `Sec-Fetch-Mode`, or guessed for clients that do not send it.
pub(crate) fn request_mode(method: &Method, headers: &HeaderMap, absolute: bool) -> RequestMode {
    match headers.get("sec-fetch-mode").and_then(|v| v.to_str().ok()) {
        Some("navigate") => RequestMode::Navigate,
        Some("same-origin") => RequestMode::SameOrigin,
        Some("no-cors") => RequestMode::NoCors,
        Some(_) => RequestMode::Cors,
        None => {
            let wants_html = headers
                .get(header::ACCEPT)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|accept| accept.contains("text/html"));
            if *method == Method::GET && wants_html {
                RequestMode::Navigate
            } else if absolute {
                RequestMode::Cors
            } else {
                RequestMode::SameOrigin
            }
        }
    }
}

fn served_response(served: Served) -> Response {
    let mut builder = Response::builder().status(served.response.status());
    for (name, value) in served.response.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }

    // The proxy does not wait for background refreshes
    drop(served.revalidation);

    builder
        .header(STRATEGY_HEADER, served.strategy.as_str())
        .header(SOURCE_HEADER, served.source.as_str())
        .body(Body::from(served.response.body().clone()))
        .unwrap_or_else(|e| {
            WorkerError::Internal(format!("unrepresentable response: {}", e)).into_response()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_origin_form_under_scope() {
        let scope = Url::parse("https://example.org/epata/").unwrap();
        let uri: Uri = "/data/courses.json?t=1".parse().unwrap();
        assert_eq!(
            resolve_url(&scope, &uri).unwrap().as_str(),
            "https://example.org/epata/data/courses.json?t=1"
        );

        let root: Uri = "/".parse().unwrap();
        assert_eq!(resolve_url(&scope, &root).unwrap().as_str(), "https://example.org/epata/");
    }

    #[test]
    fn test_resolve_absolute_form() {
        let scope = Url::parse("https://example.org/").unwrap();
        let uri: Uri = "https://docs.google.com/spreadsheets/d/e/x/pub?output=csv"
            .parse()
            .unwrap();
        assert_eq!(
            resolve_url(&scope, &uri).unwrap().as_str(),
            "https://docs.google.com/spreadsheets/d/e/x/pub?output=csv"
        );
    }

    #[test]
    fn test_colon_in_path_stays_relative() {
        let scope = Url::parse("https://example.org/").unwrap();
        let uri: Uri = "/lesson:1.html".parse().unwrap();
        assert_eq!(
            resolve_url(&scope, &uri).unwrap().as_str(),
            "https://example.org/lesson:1.html"
        );
    }

    #[test]
    fn test_request_mode_detection() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-mode", "navigate".parse().unwrap());
        assert_eq!(request_mode(&Method::GET, &headers, false), RequestMode::Navigate);

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, "text/html,application/xhtml+xml".parse().unwrap());
        assert_eq!(request_mode(&Method::GET, &headers, false), RequestMode::Navigate);
        assert_eq!(request_mode(&Method::POST, &headers, false), RequestMode::SameOrigin);

        let headers = HeaderMap::new();
        assert_eq!(request_mode(&Method::GET, &headers, true), RequestMode::Cors);
        assert_eq!(request_mode(&Method::GET, &headers, false), RequestMode::SameOrigin);
    }
}

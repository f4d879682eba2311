// Production platform: reqwest network + pluggable cache storage
// Author: kelexine (https://github.com/kelexine)

use super::Platform;
use crate::cache::{CacheStats, CacheStorage};
use crate::config::UpstreamConfig;
use crate::error::{Result, WorkerError};
use crate::models::{Request, ResponseSnapshot};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Platform that talks to real servers.
///
/// Client control (`claim_clients`, `skip_waiting`) has no page to act on
/// in a proxy, so those calls are recorded and logged.
pub struct HttpPlatform {
    http_client: Client,
    storage: Arc<dyn CacheStorage>,
    claims: AtomicU64,
    skip_requests: AtomicU64,
}

impl HttpPlatform {
    /// Create a platform with connection pooling tuned for a local proxy.
    pub fn new(config: &UpstreamConfig, storage: Arc<dyn CacheStorage>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| WorkerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created HTTP client with connection pooling and keep-alive");

        Ok(Self {
            http_client,
            storage,
            claims: AtomicU64::new(0),
            skip_requests: AtomicU64::new(0),
        })
    }

    /// Number of `claim_clients` calls so far.
    pub fn claims(&self) -> u64 {
        self.claims.load(Ordering::Relaxed)
    }

    /// Number of `skip_waiting` calls so far.
    pub fn skip_requests(&self) -> u64 {
        self.skip_requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Platform for HttpPlatform {
    async fn open_cache(&self, name: &str) -> Result<()> {
        self.storage.open(name).await
    }

    async fn put_cache(&self, name: &str, key: &str, response: ResponseSnapshot) -> Result<()> {
        self.storage.put(name, key, response).await
    }

    async fn match_cache(&self, name: &str, key: &str) -> Result<Option<ResponseSnapshot>> {
        self.storage.get(name, key).await
    }

    async fn list_cache_names(&self) -> Result<Vec<String>> {
        self.storage.names().await
    }

    async fn delete_cache(&self, name: &str) -> Result<bool> {
        self.storage.delete(name).await
    }

    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), request.url.clone());

        for (name, value) in request.headers.iter() {
            if !is_hop_by_hop(name.as_str()) {
                builder = builder.header(name, value);
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| WorkerError::Network(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        // A body cut off mid-stream is a failed fetch, not a short response
        let body = response
            .bytes()
            .await
            .map_err(|e| WorkerError::Network(e.without_url().to_string()))?;

        let mut snapshot = ResponseSnapshot::new(status, body).with_url(final_url);
        for (name, value) in headers {
            snapshot = snapshot.with_header(name, value);
        }
        Ok(snapshot)
    }

    async fn claim_clients(&self) -> Result<()> {
        let n = self.claims.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Claimed clients (claim #{})", n);
        Ok(())
    }

    async fn skip_waiting(&self) -> Result<()> {
        self.skip_requests.fetch_add(1, Ordering::Relaxed);
        debug!("Skip-waiting requested");
        Ok(())
    }

    async fn cache_stats(&self) -> Result<CacheStats> {
        self.storage.stats().await
    }
}

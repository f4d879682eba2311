// Strategy executors
// Author: kelexine (https://github.com/kelexine)
//
// Every executor resolves: a response (network, cache or fallback) or a
// network error for the caller to surface. Cache reads and writes are
// best-effort; a storage failure never costs the caller a response it
// already has.

use super::router::Strategy;
use crate::cache::{Generation, PartitionKind};
use crate::config::RemotePolicy;
use crate::error::{Result, WorkerError};
use crate::metrics;
use crate::models::{Request, ResponseSnapshot};
use crate::platform::Platform;
use crate::utils::logging::redact;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServedFrom {
    Network,
    /// Cache hit on the primary path.
    Cache,
    /// Cached copy used because the network failed.
    Fallback,
}

impl ServedFrom {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServedFrom::Network => "network",
            ServedFrom::Cache => "cache",
            ServedFrom::Fallback => "fallback",
        }
    }
}

/// Outcome of one fetch event.
#[derive(Debug)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub strategy: Strategy,
    pub source: ServedFrom,
    /// Background refetch started by [`Strategy::RefreshBehind`] on a hit.
    /// Dropping the handle detaches the task; it still runs to completion.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Served {
    pub fn new(response: ResponseSnapshot, strategy: Strategy, source: ServedFrom) -> Self {
        Self {
            response,
            strategy,
            source,
            revalidation: None,
        }
    }
}

/// Gate for a generation's runtime cache writes.
///
/// A put holds the read side until it completes. `close` takes the write
/// side, so once it returns no put is in flight and none will start.
#[derive(Debug)]
pub(crate) struct WriteGate {
    open: RwLock<bool>,
}

impl WriteGate {
    pub(crate) fn new() -> Self {
        Self {
            open: RwLock::new(true),
        }
    }

    /// Enter the gate, or `None` once it is closed.
    pub(crate) async fn enter(&self) -> Option<RwLockReadGuard<'_, bool>> {
        let guard = self.open.read().await;
        if *guard {
            Some(guard)
        } else {
            None
        }
    }

    /// Wait for in-flight writes to drain, then refuse new ones.
    pub(crate) async fn close(&self) {
        *self.open.write().await = false;
    }

    pub(crate) async fn reopen(&self) {
        *self.open.write().await = true;
    }
}

/// Per-generation strategy settings, cheap to clone into background tasks.
#[derive(Clone)]
pub(crate) struct Executor {
    platform: Arc<dyn Platform>,
    generation: Generation,
    app_shell: Url,
    remote_policy: RemotePolicy,
    cache_navigations: bool,
    writes: Arc<WriteGate>,
}

impl Executor {
    pub(crate) fn new(
        platform: Arc<dyn Platform>,
        generation: Generation,
        app_shell: Url,
        remote_policy: RemotePolicy,
        cache_navigations: bool,
        writes: Arc<WriteGate>,
    ) -> Self {
        Self {
            platform,
            generation,
            app_shell,
            remote_policy,
            cache_navigations,
            writes,
        }
    }

    pub(crate) async fn run(&self, strategy: Strategy, request: Request) -> Result<Served> {
        let key = redact(request.key());
        let served = match strategy {
            Strategy::Navigation => self.navigation(&request).await,
            Strategy::RefreshBehind => self.refresh_behind(request).await,
            Strategy::AlwaysFresh => match self.remote_policy {
                RemotePolicy::NetworkFirst => self.network_first(&request).await,
                RemotePolicy::NetworkOnly => self.network_only(strategy, &request).await,
            },
            Strategy::Bypass => self.network_only(strategy, &request).await,
            Strategy::Asset => self.cache_first(&request).await,
        };

        match &served {
            Ok(s) => metrics::record_fetch(strategy.as_str(), s.source.as_str()),
            Err(e) => {
                debug!("{} failed for {}: {}", strategy, key, e);
                metrics::record_network_failure(strategy.as_str(), "surfaced");
            }
        }
        served
    }

    /// First hit across the generation's dynamic then static partition, so a
    /// refreshed copy shadows the install-time one. Storage errors count as a
    /// miss.
    async fn lookup(&self, key: &str) -> Option<ResponseSnapshot> {
        for partition in self.generation.lookup_order() {
            match self.platform.match_cache(&partition, key).await {
                Ok(Some(hit)) => return Some(hit),
                Ok(None) => {}
                Err(e) => warn!("Cache lookup in {} failed: {}", partition, e),
            }
        }
        None
    }

    /// Store a successful response in the dynamic partition.
    async fn store(&self, key: &str, response: &ResponseSnapshot) {
        if !response.is_ok() {
            debug!("Not storing {} response for {}", response.status(), redact(key));
            return;
        }
        let Some(_open) = self.writes.enter().await else {
            debug!("Generation {} is retired, skipping write", self.generation);
            return;
        };

        let partition = self.generation.dynamic_name();
        let kind = PartitionKind::Dynamic.as_str();
        match self
            .platform
            .put_cache(&partition, key, response.stamped(Utc::now()))
            .await
        {
            Ok(()) => metrics::record_cache_write(kind, true),
            Err(e) => {
                warn!("Cache write to {} failed for {}: {}", partition, redact(key), e);
                metrics::record_cache_write(kind, false);
            }
        }
    }

    async fn navigation(&self, request: &Request) -> Result<Served> {
        match self.platform.fetch(request).await {
            Ok(response) => {
                if self.cache_navigations {
                    self.store(request.key(), &response).await;
                }
                Ok(Served::new(response, Strategy::Navigation, ServedFrom::Network))
            }
            Err(e) => {
                let cached = match self.lookup(request.key()).await {
                    Some(hit) => Some(hit),
                    None => self.lookup(self.app_shell.as_str()).await,
                };
                match cached {
                    Some(shell) => {
                        debug!("Offline navigation to {}, serving cached shell", redact(request.key()));
                        metrics::record_network_failure(Strategy::Navigation.as_str(), "recovered");
                        Ok(Served::new(shell, Strategy::Navigation, ServedFrom::Fallback))
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn refresh_behind(&self, request: Request) -> Result<Served> {
        if let Some(cached) = self.lookup(request.key()).await {
            let executor = self.clone();
            let handle = tokio::spawn(async move {
                match executor.platform.fetch(&request).await {
                    Ok(fresh) => executor.store(request.key(), &fresh).await,
                    Err(e) => {
                        debug!("Background refresh of {} failed: {}", redact(request.key()), e);
                        metrics::record_network_failure(Strategy::RefreshBehind.as_str(), "background");
                    }
                }
            });

            let mut served = Served::new(cached, Strategy::RefreshBehind, ServedFrom::Cache);
            served.revalidation = Some(handle);
            return Ok(served);
        }

        let response = self.platform.fetch(&request).await?;
        self.store(request.key(), &response).await;
        Ok(Served::new(response, Strategy::RefreshBehind, ServedFrom::Network))
    }

    async fn network_first(&self, request: &Request) -> Result<Served> {
        match self.platform.fetch(request).await {
            Ok(response) => {
                self.store(request.key(), &response).await;
                Ok(Served::new(response, Strategy::AlwaysFresh, ServedFrom::Network))
            }
            Err(e) => match self.lookup(request.key()).await {
                Some(stale) => {
                    debug!("Remote fetch of {} failed, serving stale copy", redact(request.key()));
                    metrics::record_network_failure(Strategy::AlwaysFresh.as_str(), "recovered");
                    Ok(Served::new(stale, Strategy::AlwaysFresh, ServedFrom::Fallback))
                }
                None => Err(e),
            },
        }
    }

    async fn network_only(&self, strategy: Strategy, request: &Request) -> Result<Served> {
        let response = self.platform.fetch(request).await?;
        Ok(Served::new(response, strategy, ServedFrom::Network))
    }

    async fn cache_first(&self, request: &Request) -> Result<Served> {
        if let Some(hit) = self.lookup(request.key()).await {
            return Ok(Served::new(hit, Strategy::Asset, ServedFrom::Cache));
        }
        let response = self.platform.fetch(request).await?;
        self.store(request.key(), &response).await;
        Ok(Served::new(response, Strategy::Asset, ServedFrom::Network))
    }
}

/// Pass-through used when no generation is active.
pub(crate) async fn passthrough(platform: &dyn Platform, request: &Request) -> Result<Served> {
    platform
        .fetch(request)
        .await
        .map(|response| Served::new(response, Strategy::Bypass, ServedFrom::Network))
        .map_err(|e| match e {
            WorkerError::Network(_) | WorkerError::Http(_) => e,
            other => WorkerError::Network(other.to_string()),
        })
}

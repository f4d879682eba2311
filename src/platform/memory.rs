// In-memory platform with a scripted network
// Author: kelexine (https://github.com/kelexine)

use super::Platform;
use crate::cache::{CacheStats, CacheStorage, MemoryStorage};
use crate::error::{Result, WorkerError};
use crate::models::{Request, ResponseSnapshot};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone)]
enum Route {
    Respond(ResponseSnapshot),
    Fail(String),
}

/// Platform fake for tests and dry runs.
///
/// Fetches are answered from a URL → response table; any URL without a route
/// fails like an unreachable host. Storage is a [`MemoryStorage`].
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    storage: MemoryStorage,
    routes: RwLock<HashMap<String, Route>>,
    offline: AtomicBool,
    fail_writes: AtomicBool,
    fetch_log: Mutex<Vec<String>>,
    claims: AtomicU64,
    skip_waiting_calls: AtomicU64,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response` from now on.
    pub fn respond(&self, url: &str, response: ResponseSnapshot) {
        self.routes
            .write()
            .insert(url.to_string(), Route::Respond(response.with_url(url)));
    }

    pub fn respond_text(&self, url: &str, status: u16, body: &str) {
        self.respond(url, ResponseSnapshot::new(status, body.to_string()));
    }

    /// Make fetches of `url` fail with a network error.
    pub fn fail(&self, url: &str) {
        self.routes
            .write()
            .insert(url.to_string(), Route::Fail(format!("connection reset fetching {}", url)));
    }

    /// Fail every fetch while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail every cache write while set, like an exhausted quota.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// URLs fetched so far, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetch_log.lock().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetch_log.lock().iter().filter(|u| *u == url).count()
    }

    pub fn clear_fetches(&self) {
        self.fetch_log.lock().clear();
    }

    pub fn claims(&self) -> u64 {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn skip_waiting_calls(&self) -> u64 {
        self.skip_waiting_calls.load(Ordering::SeqCst)
    }

    /// Direct access to the backing storage, bypassing write failures.
    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }
}

#[async_trait]
impl Platform for MemoryPlatform {
    async fn open_cache(&self, name: &str) -> Result<()> {
        self.storage.open(name).await
    }

    async fn put_cache(&self, name: &str, key: &str, response: ResponseSnapshot) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WorkerError::Storage(format!("quota exceeded writing {}", name)));
        }
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
        let url = request.key().to_string();
        self.fetch_log.lock().push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(WorkerError::Network(format!("offline fetching {}", url)));
        }

        let route = self.routes.read().get(&url).cloned();
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Fail(reason)) => Err(WorkerError::Network(reason)),
            None => Err(WorkerError::Network(format!("no route to {}", url))),
        }
    }

    async fn claim_clients(&self) -> Result<()> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn skip_waiting(&self) -> Result<()> {
        self.skip_waiting_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cache_stats(&self) -> Result<CacheStats> {
        self.storage.stats().await
    }
}

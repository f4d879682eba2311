//! Platform capabilities injected into the cache controller.
//!
//! The controller never reaches for ambient globals. Everything it needs from
//! its host (cache storage, the network, control over clients) comes through
//! the [`Platform`] trait:
//!
//! - `http`: the production platform, `reqwest` plus a [`CacheStorage`] backend.
//! - `memory`: an in-memory fake with a scripted network, used by tests.
//!
//! Author: kelexine (<https://github.com/kelexine>)
//!
//! [`CacheStorage`]: crate::cache::CacheStorage

pub mod http;
pub mod memory;

pub use http::HttpPlatform;
pub use memory::MemoryPlatform;

use crate::cache::CacheStats;
use crate::error::Result;
use crate::models::{Request, ResponseSnapshot};
use async_trait::async_trait;

/// Host capabilities used by the controller.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Create a cache partition if absent.
    async fn open_cache(&self, name: &str) -> Result<()>;

    /// Store a snapshot in a partition.
    async fn put_cache(&self, name: &str, key: &str, response: ResponseSnapshot) -> Result<()>;

    /// Look up `key` in one partition.
    async fn match_cache(&self, name: &str, key: &str) -> Result<Option<ResponseSnapshot>>;

    /// Every partition name in storage.
    async fn list_cache_names(&self) -> Result<Vec<String>>;

    /// Drop a partition; returns whether it existed.
    async fn delete_cache(&self, name: &str) -> Result<bool>;

    /// Issue a network request. `Err` means the fetch itself failed; HTTP
    /// error statuses are successful fetches.
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot>;

    /// Take control of already-open clients.
    async fn claim_clients(&self) -> Result<()>;

    /// Ask to skip the waiting phase after install.
    async fn skip_waiting(&self) -> Result<()>;

    /// Entry counts per partition.
    async fn cache_stats(&self) -> Result<CacheStats>;
}

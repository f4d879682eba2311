// Cache controller - one generation of the offline cache
// Author: kelexine (https://github.com/kelexine)

use super::lifecycle::WorkerState;
use super::router::{Router, Strategy};
use super::strategy::{Executor, Served, WriteGate};
use crate::cache::Generation;
use crate::config::WorkerConfig;
use crate::error::{Result, WorkerError};
use crate::models::Request;
use crate::platform::Platform;
use crate::utils::logging::redact;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// The cache controller for one generation.
///
/// Owns the generation's settings, its routing table and its lifecycle
/// state. All host access goes through the injected [`Platform`].
pub struct CacheController {
    config: WorkerConfig,
    scope: Url,
    generation: Generation,
    router: Router,
    executor: Executor,
    platform: Arc<dyn Platform>,
    state: RwLock<WorkerState>,
    writes: Arc<WriteGate>,
    skip_waiting: AtomicBool,
    activated: AtomicBool,
}

impl CacheController {
    /// Create a controller in the `Parsed` state.
    pub fn new(config: WorkerConfig, scope: Url, platform: Arc<dyn Platform>) -> Result<Self> {
        let generation = Generation::new(config.version.trim());
        let app_shell = scope.join(&config.app_shell)?;
        let router = Router::new(&config, scope.clone());
        let writes = Arc::new(WriteGate::new());

        let executor = Executor::new(
            platform.clone(),
            generation.clone(),
            app_shell,
            config.remote_policy,
            config.cache_navigations,
            writes.clone(),
        );

        Ok(Self {
            config,
            scope,
            generation,
            router,
            executor,
            platform,
            state: RwLock::new(WorkerState::Parsed),
            writes,
            skip_waiting: AtomicBool::new(false),
            activated: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn version(&self) -> &str {
        self.generation.version()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    /// Manifest entries resolved against the scope, duplicates removed.
    pub fn manifest_urls(&self) -> Result<Vec<Url>> {
        let mut urls: Vec<Url> = Vec::with_capacity(self.config.static_manifest.len());
        for entry in &self.config.static_manifest {
            let url = self.scope.join(entry)?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(urls)
    }

    /// Whether install asked to skip the waiting phase.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_activated(&self) {
        self.activated.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        *self.state.write() = state;
    }

    /// Move `from → to`, failing if the current state is not `from`.
    pub(crate) fn transition(&self, from: WorkerState, to: WorkerState) -> Result<()> {
        let mut state = self.state.write();
        if *state != from {
            return Err(WorkerError::InvalidState {
                expected: from.to_string(),
                actual: state.to_string(),
            });
        }
        *state = to;
        Ok(())
    }

    /// Stop writing to storage while still serving reads. Returns once
    /// every write already in flight has landed.
    pub(crate) async fn suspend_writes(&self) {
        self.writes.close().await;
    }

    pub(crate) async fn resume_writes(&self) {
        self.writes.reopen().await;
    }

    /// Superseded or failed: no more writes.
    pub async fn retire(&self) {
        self.suspend_writes().await;
        self.set_state(WorkerState::Redundant);
    }

    /// Classify a request without serving it.
    pub fn classify(&self, request: &Request) -> Strategy {
        self.router.classify(request)
    }

    /// Serve one fetch event.
    ///
    /// `Err` carries a network failure no fallback could cover; callers turn
    /// it into an error response. A generation superseded while a request
    /// was in flight still serves it, without writing to storage.
    pub async fn handle_fetch(&self, request: Request) -> Result<Served> {
        let state = self.state();
        let superseded = state == WorkerState::Redundant && self.activated.load(Ordering::SeqCst);
        if !state.can_intercept_fetch() && !superseded {
            return Err(WorkerError::InvalidState {
                expected: WorkerState::Activated.to_string(),
                actual: state.to_string(),
            });
        }

        let strategy = self.router.classify(&request);
        debug!(
            "{} {} -> {}",
            request.method,
            redact(request.key()),
            strategy
        );
        self.executor.run(strategy, request).await
    }
}

// Registration - owns the active and waiting generations
// Author: kelexine (https://github.com/kelexine)

use super::controller::CacheController;
use super::lifecycle::ActivationReport;
use super::strategy::{passthrough, Served};
use crate::config::WorkerConfig;
use crate::error::Result;
use crate::metrics;
use crate::models::{Request, WorkerMessage};
use crate::platform::Platform;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

/// Result of registering a generation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// The version token is already active or already waiting.
    Unchanged { version: String },
    /// Installed (or restored) and activated.
    Activated {
        version: String,
        report: ActivationReport,
    },
    /// Installed; activates on `SKIP_WAITING`.
    Waiting { version: String },
}

/// Holds the controller generations for one scope.
///
/// Requests are served by the active generation. A newly installed
/// generation either takes over at once (it asked to skip waiting, or
/// nothing is active) or waits for a `SKIP_WAITING` message. While no
/// generation is active, requests go straight to the network.
pub struct Registration {
    platform: Arc<dyn Platform>,
    scope: Url,
    active: RwLock<Option<Arc<CacheController>>>,
    waiting: RwLock<Option<Arc<CacheController>>>,
    // Serializes install/activate cycles; fetches never take it
    lifecycle: Mutex<()>,
}

impl Registration {
    pub fn new(platform: Arc<dyn Platform>, scope: Url) -> Self {
        Self {
            platform,
            scope,
            active: RwLock::new(None),
            waiting: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn active(&self) -> Option<Arc<CacheController>> {
        self.active.read().clone()
    }

    pub fn waiting(&self) -> Option<Arc<CacheController>> {
        self.waiting.read().clone()
    }

    /// Install a generation built from `config`.
    ///
    /// With nothing active yet, a static partition left by an earlier run of
    /// the same version is adopted without going to the network. An install
    /// failure leaves the active generation serving and is returned as-is;
    /// there is no retry loop, the next `register` call retries.
    pub async fn register(&self, config: WorkerConfig) -> Result<RegisterOutcome> {
        let _guard = self.lifecycle.lock().await;
        let version = config.version.trim().to_string();

        let current = [self.active(), self.waiting()];
        if current.iter().flatten().any(|c| c.version() == version) {
            info!("Generation {} already registered", version);
            return Ok(RegisterOutcome::Unchanged { version });
        }

        let controller = Arc::new(CacheController::new(
            config,
            self.scope.clone(),
            self.platform.clone(),
        )?);

        let nothing_active = self.active().is_none();
        let restored = nothing_active && controller.restore().await?;
        if !restored {
            controller.install().await?;
        }

        if restored || nothing_active || controller.skip_waiting_requested() {
            let report = self.promote(controller).await?;
            return Ok(RegisterOutcome::Activated { version, report });
        }

        info!("Generation {} installed and waiting", version);
        let previous = self.waiting.write().replace(controller);
        if let Some(previous) = previous {
            previous.retire().await;
        }
        Ok(RegisterOutcome::Waiting { version })
    }

    /// Handle a message from the host page. Returns the version activated,
    /// if any.
    pub async fn post_message(&self, message: WorkerMessage) -> Result<Option<String>> {
        match message {
            WorkerMessage::SkipWaiting => {
                let _guard = self.lifecycle.lock().await;
                let Some(waiting) = self.waiting() else {
                    info!("SKIP_WAITING received with no waiting generation");
                    return Ok(None);
                };
                let version = waiting.version().to_string();
                self.promote(waiting).await?;
                metrics::record_lifecycle("skip_waiting", true);
                Ok(Some(version))
            }
        }
    }

    /// Activate `controller` and make it current. Caller holds `lifecycle`.
    async fn promote(&self, controller: Arc<CacheController>) -> Result<ActivationReport> {
        let previous = self.active();
        if let Some(previous) = &previous {
            // Keep serving reads during the sweep, but never recreate a
            // partition it is about to lose. Waits out in-flight puts.
            previous.suspend_writes().await;
        }

        let report = match controller.activate().await {
            Ok(report) => report,
            Err(e) => {
                warn!("Activation of {} failed: {}", controller.version(), e);
                if let Some(previous) = &previous {
                    previous.resume_writes().await;
                }
                return Err(e);
            }
        };

        *self.active.write() = Some(controller.clone());
        {
            let mut waiting = self.waiting.write();
            if waiting.as_ref().is_some_and(|w| Arc::ptr_eq(w, &controller)) {
                *waiting = None;
            }
        }
        if let Some(previous) = previous {
            previous.retire().await;
        }
        Ok(report)
    }

    /// Serve a fetch through the active generation, or straight from the
    /// network when none is active.
    pub async fn handle_fetch(&self, request: Request) -> Result<Served> {
        match self.active() {
            Some(controller) => controller.handle_fetch(request).await,
            None => passthrough(self.platform.as_ref(), &request).await,
        }
    }
}

//! Install and activate phases.
//!
//! Install pre-warms the generation's static partition from the manifest and
//! is all-or-nothing. Activate sweeps every partition that does not belong to
//! the generation and claims clients.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use super::controller::CacheController;
use crate::error::{Result, WorkerError};
use crate::metrics;
use crate::models::Request;
use crate::utils::logging::redact;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, not yet installed
    Parsed,
    Installing,
    /// Installed, waiting to activate
    Installed,
    Activating,
    /// Serving fetches
    Activated,
    /// Failed install or superseded
    Redundant,
}

impl WorkerState {
    /// Only an activated worker may intercept fetches.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// What an activation sweep did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivationReport {
    /// Stale partitions deleted.
    pub deleted: Vec<String>,
    /// Stale partitions whose deletion failed; the next activation retries them.
    pub failed: Vec<String>,
}

impl CacheController {
    /// Pre-cache every manifest URL into the static partition.
    ///
    /// Fetches run concurrently and nothing is written until all of them
    /// have succeeded with a 2xx. On any failure the controller becomes
    /// redundant and no static partition is left behind.
    pub async fn install(&self) -> Result<()> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;
        let generation = self.generation().clone();
        info!("Installing generation {}", generation);

        let result = self.precache().await;
        match &result {
            Ok(count) => {
                self.set_state(WorkerState::Installed);
                metrics::record_lifecycle("install", true);
                info!("Generation {} installed ({} assets)", generation, count);

                if self.config().skip_waiting_on_install {
                    match self.platform().skip_waiting().await {
                        Ok(()) => self.mark_skip_waiting(),
                        Err(e) => warn!("skip_waiting failed: {}", e),
                    }
                }
            }
            Err(e) => {
                self.retire().await;
                metrics::record_lifecycle("install", false);
                warn!("Generation {} failed to install: {}", generation, e);
            }
        }
        result.map(|_| ())
    }

    async fn precache(&self) -> Result<usize> {
        let urls = self.manifest_urls()?;
        let platform = self.platform();

        let fetches = urls.iter().map(|url| {
            let request = Request::get(url.clone());
            async move { (url, platform.fetch(&request).await) }
        });

        let mut responses = Vec::with_capacity(urls.len());
        for (url, outcome) in join_all(fetches).await {
            let reason = match outcome {
                Ok(response) if response.is_ok() => {
                    responses.push((url.as_str().to_string(), response));
                    continue;
                }
                Ok(response) => format!("HTTP {}", response.status()),
                Err(e) => e.to_string(),
            };
            return Err(WorkerError::InstallFailed {
                url: redact(url.as_str()),
                reason,
            });
        }

        let partition = self.generation().static_name();
        platform.open_cache(&partition).await?;

        let now = Utc::now();
        for (key, response) in &responses {
            if let Err(e) = platform.put_cache(&partition, key, response.stamped(now)).await {
                metrics::record_cache_write("static", false);
                // Leave nothing half-written behind
                if let Err(cleanup) = platform.delete_cache(&partition).await {
                    warn!("Failed to remove partial partition {}: {}", partition, cleanup);
                }
                return Err(WorkerError::InstallFailed {
                    url: redact(key),
                    reason: e.to_string(),
                });
            }
            metrics::record_cache_write("static", true);
        }

        Ok(responses.len())
    }

    /// Adopt a static partition left by an earlier run of the same
    /// generation, without touching the network.
    ///
    /// Returns `false` (and stays `Parsed`) unless every manifest entry is
    /// already stored.
    pub async fn restore(&self) -> Result<bool> {
        if self.state() != WorkerState::Parsed {
            return Ok(false);
        }
        let partition = self.generation().static_name();
        for url in self.manifest_urls()? {
            match self.platform().match_cache(&partition, url.as_str()).await {
                Ok(Some(_)) => {}
                Ok(None) => return Ok(false),
                Err(e) => {
                    debug!("Restore lookup in {} failed: {}", partition, e);
                    return Ok(false);
                }
            }
        }

        self.transition(WorkerState::Parsed, WorkerState::Installed)?;
        metrics::record_lifecycle("restore", true);
        info!("Restored generation {} from storage", self.generation());
        Ok(true)
    }

    /// Delete every partition not owned by this generation, then claim
    /// clients.
    pub async fn activate(&self) -> Result<ActivationReport> {
        self.transition(WorkerState::Installed, WorkerState::Activating)?;
        let generation = self.generation().clone();
        let platform = self.platform();

        let names = match platform.list_cache_names().await {
            Ok(names) => names,
            Err(e) => {
                self.set_state(WorkerState::Installed);
                metrics::record_lifecycle("activate", false);
                return Err(e);
            }
        };

        let mut report = ActivationReport::default();
        for name in names.into_iter().filter(|n| !generation.owns(n)) {
            match platform.delete_cache(&name).await {
                Ok(_) => {
                    debug!("Deleted stale partition {}", name);
                    metrics::record_sweep(true);
                    report.deleted.push(name);
                }
                Err(e) => {
                    warn!("Failed to delete stale partition {}: {}", name, e);
                    metrics::record_sweep(false);
                    report.failed.push(name);
                }
            }
        }

        if let Err(e) = platform.claim_clients().await {
            warn!("claim_clients failed: {}", e);
        }

        self.set_state(WorkerState::Activated);
        self.mark_activated();
        metrics::record_lifecycle("activate", true);
        metrics::set_active_generation(generation.version());
        if let Ok(names) = platform.list_cache_names().await {
            metrics::update_partition_count(names.len());
        }

        info!(
            "Generation {} activated, {} stale partition(s) removed",
            generation,
            report.deleted.len()
        );
        Ok(report)
    }
}

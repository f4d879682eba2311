// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{Result, WorkerError};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use url::Url;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Config file (`path`, or `~/.swcache/config.toml`)
    /// 3. Defaults (lowest)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(Self::default_config_path);

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // An explicit path must exist, the default one may not
            .add_source(File::with_name(&file).required(path.is_some()))
            // Override with environment variables (e.g. SWCACHE_WORKER__VERSION)
            .add_source(
                Environment::with_prefix("SWCACHE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| WorkerError::Config(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| WorkerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would produce an unusable generation.
    pub fn validate(&self) -> Result<()> {
        self.scope_url()?;
        if self.worker.version.trim().is_empty() {
            return Err(WorkerError::Config("worker.version must not be empty".into()));
        }
        if self.worker.static_manifest.is_empty() {
            return Err(WorkerError::Config(
                "worker.static_manifest must list at least one asset".into(),
            ));
        }
        Ok(())
    }

    /// The upstream origin as a directory URL, so relative manifest entries
    /// resolve beneath it.
    pub fn scope_url(&self) -> Result<Url> {
        let mut origin = self.upstream.origin.trim().to_string();
        if !origin.ends_with('/') {
            origin.push('/');
        }
        let url = Url::parse(&origin)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(WorkerError::Config(format!(
                "upstream.origin must be http(s), got {}",
                url.scheme()
            )));
        }
        Ok(url)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| WorkerError::Config(e.to_string()))
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".swcache")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}

//! Configuration data structures for the swcache proxy.
//!
//! This module defines the schema for the application settings: the proxy
//! listener, the upstream origin, the per-generation worker settings (version
//! token, manifest, host lists) and the cache storage backend.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port).
    #[serde(default)]
    pub server: ServerConfig,

    /// Origin server the proxy fronts.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Settings baked into one cache generation.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Where cache partitions live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Settings for the origin server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the app. Doubles as the worker scope: manifest entries and
    /// origin-form requests resolve against it.
    /// Default: `http://127.0.0.1:3000/`
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Whole-request timeout in seconds. A timeout surfaces as a fetch failure.
    /// Default: `30`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// Policy for remote dynamic-content hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemotePolicy {
    /// Network first; store on success, serve the cached copy on failure.
    #[default]
    NetworkFirst,
    /// Network only; failures reach the caller and nothing is stored.
    NetworkOnly,
}

/// Install-time settings of one cache generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Version token baked into both partition names.
    /// Default: `v1`
    #[serde(default = "default_version")]
    pub version: String,

    /// Assets that must be pre-cached for install to succeed, relative to the
    /// scope URL.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Document served for offline navigations.
    /// Default: `./index.html`
    #[serde(default = "default_app_shell")]
    pub app_shell: String,

    /// Path suffixes that mark same-origin data files.
    /// Default: `[".json"]`
    #[serde(default = "default_data_extensions")]
    pub data_extensions: Vec<String>,

    /// Hosts never handled as local data; they are treated as remote
    /// dynamic content instead.
    #[serde(default = "default_excluded_hosts")]
    pub excluded_hosts: Vec<String>,

    /// External content providers that must stay fresh.
    #[serde(default = "default_remote_hosts")]
    pub remote_hosts: Vec<String>,

    /// Metrics providers whose traffic is never cached.
    #[serde(default = "default_analytics_hosts")]
    pub analytics_hosts: Vec<String>,

    /// Freshness policy for `remote_hosts`.
    /// Default: `network_first`
    #[serde(default)]
    pub remote_policy: RemotePolicy,

    /// Whether successful navigations are stored in the dynamic partition.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub cache_navigations: bool,

    /// Whether a successful install asks to skip the waiting phase.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,
}

/// Cache storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Disk,
}

/// Settings for cache storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `memory` or `disk`.
    /// Default: `memory`
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the disk backend.
    /// Default: `~/.swcache/caches`
    #[serde(default = "default_storage_path")]
    pub path: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to mask secrets carried in URL query strings.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub redact_urls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            static_manifest: default_static_manifest(),
            app_shell: default_app_shell(),
            data_extensions: default_data_extensions(),
            excluded_hosts: default_excluded_hosts(),
            remote_hosts: default_remote_hosts(),
            analytics_hosts: default_analytics_hosts(),
            remote_policy: RemotePolicy::default(),
            cache_navigations: true,
            skip_waiting_on_install: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            redact_urls: true,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_origin() -> String {
    "http://127.0.0.1:3000/".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_static_manifest() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./style.css",
        "./script.js",
        "./icons/icon-192.png",
        "./icons/icon-512.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_app_shell() -> String {
    "./index.html".to_string()
}

fn default_data_extensions() -> Vec<String> {
    vec![".json".to_string()]
}

fn default_excluded_hosts() -> Vec<String> {
    vec!["raw.githubusercontent.com".to_string()]
}

fn default_remote_hosts() -> Vec<String> {
    vec![
        "docs.google.com".to_string(),
        "sheets.googleapis.com".to_string(),
        "drive.google.com".to_string(),
    ]
}

fn default_analytics_hosts() -> Vec<String> {
    vec![
        "googletagmanager.com".to_string(),
        "google-analytics.com".to_string(),
    ]
}

fn default_storage_path() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".swcache")
        .join("caches")
        .to_string_lossy()
        .to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

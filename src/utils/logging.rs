//! Structured logging and URL redaction utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats, and masks secrets that published
//! spreadsheet and API URLs tend to carry in their query strings.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

lazy_static! {
    static ref SECRET_PARAM: Regex =
        Regex::new(r"(?i)([?&](?:key|api_key|token|access_token|sig|signature)=)[^&#\s]+")
            .expect("static regex");
}

static REDACT_URLS: AtomicBool = AtomicBool::new(true);

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    REDACT_URLS.store(config.redact_urls, Ordering::Relaxed);

    // Configure filter from environment or config file
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

/// Masks secret query parameters (`key`, `token`, `sig`, ...) in a URL
/// before it is logged. Returns the input unchanged when redaction is off.
pub fn redact(url: &str) -> String {
    if !REDACT_URLS.load(Ordering::Relaxed) {
        return url.to_string();
    }
    SECRET_PARAM.replace_all(url, "${1}[REDACTED]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_api_key() {
        let input = "https://sheets.googleapis.com/v4/spreadsheets/abc/values/A1?key=AIzaSyD-secret&alt=json";
        let output = redact(input);
        assert!(output.contains("key=[REDACTED]"));
        assert!(output.contains("&alt=json"));
        assert!(!output.contains("AIzaSyD-secret"));
    }

    #[test]
    fn test_redact_leaves_plain_urls() {
        let input = "https://docs.google.com/spreadsheets/d/e/x/pub?gid=0&single=true&output=csv";
        assert_eq!(redact(input), input);
    }
}

// Shared fixtures for integration tests
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use std::sync::Arc;
use swcache::config::WorkerConfig;
use swcache::models::Request;
use swcache::platform::MemoryPlatform;
use swcache::worker::Registration;
use url::Url;

pub const SCOPE: &str = "https://app.test/";
pub const SHELL_HTML: &str = "<!doctype html><title>shell</title>";

pub fn scope() -> Url {
    Url::parse(SCOPE).unwrap()
}

pub fn url(path: &str) -> Url {
    scope().join(path).unwrap()
}

pub fn get(path: &str) -> Request {
    Request::get(url(path))
}

/// Worker settings for `version` with a small manifest.
pub fn worker_config(version: &str, manifest: &[&str]) -> WorkerConfig {
    WorkerConfig {
        version: version.to_string(),
        static_manifest: manifest.iter().map(|s| s.to_string()).collect(),
        ..WorkerConfig::default()
    }
}

/// Route every manifest entry of the default fixture app.
pub fn serve_app(platform: &MemoryPlatform) {
    platform.respond_text(SCOPE, 200, SHELL_HTML);
    platform.respond_text(&format!("{}index.html", SCOPE), 200, SHELL_HTML);
    platform.respond_text(&format!("{}style.css", SCOPE), 200, "body { margin: 0 }");
    platform.respond_text(&format!("{}script.js", SCOPE), 200, "console.log('v')");
}

pub const APP_MANIFEST: &[&str] = &["./", "./index.html", "./style.css", "./script.js"];

/// A registration with generation `v1` of the fixture app active.
pub async fn active_app() -> (Arc<MemoryPlatform>, Registration) {
    let platform = Arc::new(MemoryPlatform::new());
    serve_app(&platform);
    let registration = Registration::new(platform.clone(), scope());
    registration
        .register(worker_config("v1", APP_MANIFEST))
        .await
        .unwrap();
    platform.clear_fetches();
    (platform, registration)
}

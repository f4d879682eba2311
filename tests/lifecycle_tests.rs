// Install, activate and version cutover tests
// Author: kelexine (https://github.com/kelexine)

mod common;

use async_trait::async_trait;
use common::*;
use std::sync::Arc;
use std::time::Duration;
use swcache::cache::{CacheStats, CacheStorage};
use swcache::error::WorkerError;
use swcache::models::{Request, ResponseSnapshot, WorkerMessage};
use swcache::platform::{MemoryPlatform, Platform};
use swcache::worker::{RegisterOutcome, Registration, WorkerState};
use tokio::sync::Notify;

/// Platform whose writes to one partition stall until released, like a
/// slow disk.
struct StallingPlatform {
    inner: MemoryPlatform,
    partition: String,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Platform for StallingPlatform {
    async fn open_cache(&self, name: &str) -> swcache::error::Result<()> {
        self.inner.open_cache(name).await
    }

    async fn put_cache(
        &self,
        name: &str,
        key: &str,
        response: ResponseSnapshot,
    ) -> swcache::error::Result<()> {
        if name == self.partition {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.put_cache(name, key, response).await
    }

    async fn match_cache(
        &self,
        name: &str,
        key: &str,
    ) -> swcache::error::Result<Option<ResponseSnapshot>> {
        self.inner.match_cache(name, key).await
    }

    async fn list_cache_names(&self) -> swcache::error::Result<Vec<String>> {
        self.inner.list_cache_names().await
    }

    async fn delete_cache(&self, name: &str) -> swcache::error::Result<bool> {
        self.inner.delete_cache(name).await
    }

    async fn fetch(&self, request: &Request) -> swcache::error::Result<ResponseSnapshot> {
        self.inner.fetch(request).await
    }

    async fn claim_clients(&self) -> swcache::error::Result<()> {
        self.inner.claim_clients().await
    }

    async fn skip_waiting(&self) -> swcache::error::Result<()> {
        self.inner.skip_waiting().await
    }

    async fn cache_stats(&self) -> swcache::error::Result<CacheStats> {
        self.inner.cache_stats().await
    }
}

#[tokio::test]
async fn test_first_install_activates_and_claims() {
    let platform = Arc::new(MemoryPlatform::new());
    serve_app(&platform);
    let registration = Registration::new(platform.clone(), scope());

    let outcome = registration
        .register(worker_config("v1", APP_MANIFEST))
        .await
        .unwrap();
    assert!(matches!(outcome, RegisterOutcome::Activated { ref version, .. } if version == "v1"));

    let active = registration.active().unwrap();
    assert_eq!(active.state(), WorkerState::Activated);
    assert_eq!(platform.claims(), 1);
    assert_eq!(platform.skip_waiting_calls(), 1);

    let keys = platform.storage().keys("static-v1").await.unwrap();
    assert_eq!(keys.len(), APP_MANIFEST.len());
    let shell = platform
        .match_cache("static-v1", &format!("{}index.html", SCOPE))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shell.text(), SHELL_HTML);
    assert!(shell.stored_at().is_some());
}

#[tokio::test]
async fn test_install_is_all_or_nothing() {
    let platform = Arc::new(MemoryPlatform::new());
    serve_app(&platform);
    platform.fail(&format!("{}script.js", SCOPE));
    let registration = Registration::new(platform.clone(), scope());

    let err = registration
        .register(worker_config("v1", APP_MANIFEST))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::InstallFailed { ref url, .. } if url.ends_with("script.js")));

    assert!(registration.active().is_none());
    assert!(platform.list_cache_names().await.unwrap().is_empty());
    assert_eq!(platform.claims(), 0);
}

#[tokio::test]
async fn test_non_2xx_manifest_entry_fails_install() {
    let platform = Arc::new(MemoryPlatform::new());
    serve_app(&platform);
    platform.respond_text(&format!("{}style.css", SCOPE), 404, "not found");
    let registration = Registration::new(platform.clone(), scope());

    let err = registration
        .register(worker_config("v1", APP_MANIFEST))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 404"));
    assert!(platform.list_cache_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_failure_during_install_leaves_no_partition() {
    let platform = Arc::new(MemoryPlatform::new());
    serve_app(&platform);
    platform.set_fail_writes(true);
    let registration = Registration::new(platform.clone(), scope());

    let result = registration
        .register(worker_config("v1", APP_MANIFEST))
        .await;
    assert!(matches!(result, Err(WorkerError::InstallFailed { .. })));
    assert!(!platform
        .list_cache_names()
        .await
        .unwrap()
        .contains(&"static-v1".to_string()));
}

#[tokio::test]
async fn test_version_cutover_sweeps_old_partitions() {
    let platform = Arc::new(MemoryPlatform::new());
    serve_app(&platform);
    let registration = Registration::new(platform.clone(), scope());

    registration
        .register(worker_config("v9", &["./", "./style.css"]))
        .await
        .unwrap();

    // Dynamic content for v9 plus an unrelated partition
    platform.respond_text(&format!("{}img/logo.png", SCOPE), 200, "png");
    registration.handle_fetch(get("img/logo.png")).await.unwrap();
    platform.open_cache("scratch").await.unwrap();
    assert_eq!(platform.list_cache_names().await.unwrap().len(), 3);

    let outcome = registration
        .register(worker_config("v10", &["./", "./style.css", "./script.js"]))
        .await
        .unwrap();

    let RegisterOutcome::Activated { version, report } = outcome else {
        panic!("expected activation, got {:?}", outcome);
    };
    assert_eq!(version, "v10");
    let mut deleted = report.deleted.clone();
    deleted.sort();
    assert_eq!(deleted, vec!["dynamic-v9", "scratch", "static-v9"]);
    assert!(report.failed.is_empty());

    let names = platform.list_cache_names().await.unwrap();
    assert!(names
        .iter()
        .all(|n| n == "static-v10" || n == "dynamic-v10"));
    assert_eq!(platform.storage().keys("static-v10").await.unwrap().len(), 3);
    assert_eq!(registration.active().unwrap().version(), "v10");
}

#[tokio::test]
async fn test_similar_version_partitions_are_swept() {
    let platform = Arc::new(MemoryPlatform::new());
    serve_app(&platform);
    platform.open_cache("static-v10").await.unwrap();
    platform.open_cache("dynamic-v1-old").await.unwrap();
    let registration = Registration::new(platform.clone(), scope());

    registration
        .register(worker_config("v1", APP_MANIFEST))
        .await
        .unwrap();

    assert_eq!(platform.list_cache_names().await.unwrap(), vec!["static-v1"]);
}

#[tokio::test]
async fn test_waiting_generation_activates_on_skip_waiting() {
    let (platform, registration) = active_app().await;

    let mut next = worker_config("v2", APP_MANIFEST);
    next.skip_waiting_on_install = false;
    let outcome = registration.register(next).await.unwrap();
    assert!(matches!(outcome, RegisterOutcome::Waiting { .. }));

    // v1 keeps serving, both static partitions coexist
    assert_eq!(registration.active().unwrap().version(), "v1");
    assert_eq!(registration.waiting().unwrap().state(), WorkerState::Installed);
    let names = platform.list_cache_names().await.unwrap();
    assert!(names.contains(&"static-v1".to_string()));
    assert!(names.contains(&"static-v2".to_string()));

    let activated = registration
        .post_message(WorkerMessage::SkipWaiting)
        .await
        .unwrap();
    assert_eq!(activated.as_deref(), Some("v2"));
    assert_eq!(registration.active().unwrap().version(), "v2");
    assert!(registration.waiting().is_none());
    assert_eq!(platform.list_cache_names().await.unwrap(), vec!["static-v2"]);
}

#[tokio::test]
async fn test_skip_waiting_without_waiting_generation() {
    let (_platform, registration) = active_app().await;
    let activated = registration
        .post_message(WorkerMessage::SkipWaiting)
        .await
        .unwrap();
    assert!(activated.is_none());
    assert_eq!(registration.active().unwrap().version(), "v1");
}

#[tokio::test]
async fn test_same_version_is_unchanged() {
    let (platform, registration) = active_app().await;

    let outcome = registration
        .register(worker_config("v1", &["./", "./other.css"]))
        .await
        .unwrap();
    assert!(matches!(outcome, RegisterOutcome::Unchanged { .. }));
    assert!(platform.fetches().is_empty());
}

#[tokio::test]
async fn test_failed_update_keeps_old_generation_serving() {
    let (platform, registration) = active_app().await;

    let result = registration
        .register(worker_config("v2", &["./", "./missing.css"]))
        .await;
    assert!(result.is_err());

    let active = registration.active().unwrap();
    assert_eq!(active.version(), "v1");
    assert_eq!(active.state(), WorkerState::Activated);
    assert!(!platform
        .list_cache_names()
        .await
        .unwrap()
        .contains(&"static-v2".to_string()));

    let served = registration.handle_fetch(get("style.css")).await.unwrap();
    assert_eq!(served.response.text(), "body { margin: 0 }");
}

#[tokio::test]
async fn test_restore_skips_network() {
    let (platform, _first) = active_app().await;

    // A fresh registration over the same storage, as after a restart
    let registration = Registration::new(platform.clone(), scope());
    let outcome = registration
        .register(worker_config("v1", APP_MANIFEST))
        .await
        .unwrap();

    assert!(matches!(outcome, RegisterOutcome::Activated { .. }));
    assert!(platform.fetches().is_empty());
    assert_eq!(registration.active().unwrap().state(), WorkerState::Activated);
}

#[tokio::test]
async fn test_incomplete_partition_is_reinstalled() {
    let platform = Arc::new(MemoryPlatform::new());
    serve_app(&platform);
    platform
        .put_cache("static-v1", SCOPE, ResponseSnapshot::new(200, "stale"))
        .await
        .unwrap();

    let registration = Registration::new(platform.clone(), scope());
    registration
        .register(worker_config("v1", APP_MANIFEST))
        .await
        .unwrap();

    assert_eq!(platform.fetches().len(), APP_MANIFEST.len());
    let root = platform.match_cache("static-v1", SCOPE).await.unwrap().unwrap();
    assert_eq!(root.text(), SHELL_HTML);
}

#[tokio::test]
async fn test_passthrough_without_active_generation() {
    let platform = Arc::new(MemoryPlatform::new());
    platform.respond_text(&format!("{}style.css", SCOPE), 200, "css");
    let registration = Registration::new(platform.clone(), scope());

    let served = registration.handle_fetch(get("style.css")).await.unwrap();
    assert_eq!(served.response.text(), "css");
    assert!(platform.list_cache_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retired_generation_does_not_write() {
    let (platform, registration) = active_app().await;
    let old = registration.active().unwrap();

    registration
        .register(worker_config("v2", APP_MANIFEST))
        .await
        .unwrap();
    assert_eq!(old.state(), WorkerState::Redundant);

    // A request that reached the old generation mid-cutover is served, not stored
    platform.respond_text(&format!("{}img/a.png", SCOPE), 200, "png");
    let served = old.handle_fetch(get("img/a.png")).await.unwrap();
    assert_eq!(served.response.text(), "png");
    assert!(!platform
        .list_cache_names()
        .await
        .unwrap()
        .contains(&"dynamic-v1".to_string()));
}

#[tokio::test]
async fn test_in_flight_write_cannot_outlive_cutover() {
    let inner = MemoryPlatform::new();
    serve_app(&inner);
    inner.respond_text(&format!("{}img/slow.png", SCOPE), 200, "png");
    let platform = Arc::new(StallingPlatform {
        inner,
        partition: "dynamic-v1".to_string(),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let registration = Arc::new(Registration::new(platform.clone(), scope()));
    registration
        .register(worker_config("v1", APP_MANIFEST))
        .await
        .unwrap();

    // A v1 asset write is stuck inside put_cache
    let fetch = tokio::spawn({
        let registration = registration.clone();
        async move { registration.handle_fetch(get("img/slow.png")).await }
    });
    platform.entered.notified().await;

    let cutover = tokio::spawn({
        let registration = registration.clone();
        async move {
            registration
                .register(worker_config("v2", APP_MANIFEST))
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    platform.release.notify_one();

    let served = fetch.await.unwrap().unwrap();
    assert_eq!(served.response.text(), "png");
    let outcome = cutover.await.unwrap().unwrap();
    assert!(matches!(outcome, RegisterOutcome::Activated { .. }));

    let names = platform.list_cache_names().await.unwrap();
    assert!(
        names.iter().all(|n| n.ends_with("-v2")),
        "stale partition survived cutover: {:?}",
        names
    );
}

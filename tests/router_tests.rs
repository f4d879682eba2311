// Request classification tests
// Author: kelexine (https://github.com/kelexine)

use swcache::config::WorkerConfig;
use swcache::models::{Request, RequestMode};
use swcache::worker::{Router, Strategy};
use url::Url;

fn router() -> Router {
    Router::new(
        &WorkerConfig::default(),
        Url::parse("https://example.org/epata/").unwrap(),
    )
}

fn get(url: &str) -> Request {
    Request::get(Url::parse(url).unwrap())
}

#[test]
fn test_classification_table() {
    let router = router();
    let cases = [
        ("https://example.org/epata/data/courses.json", Strategy::RefreshBehind),
        ("https://example.org/epata/data/COURSES.JSON", Strategy::RefreshBehind),
        (
            "https://docs.google.com/spreadsheets/d/e/x/pub?output=csv",
            Strategy::AlwaysFresh,
        ),
        ("https://sheets.googleapis.com/v4/spreadsheets/x", Strategy::AlwaysFresh),
        ("https://drive.google.com/uc?id=abc", Strategy::AlwaysFresh),
        ("https://www.googletagmanager.com/gtag/js?id=G-1", Strategy::Bypass),
        ("https://region1.google-analytics.com/g/collect", Strategy::Bypass),
        ("https://example.org/epata/style.css", Strategy::Asset),
        ("https://cdn.example.net/lib/chart.js", Strategy::Asset),
    ];

    for (url, expected) in cases {
        assert_eq!(router.classify(&get(url)), expected, "{}", url);
    }
}

#[test]
fn test_navigation_wins_over_data_suffix() {
    let router = router();
    let request = Request::navigate(Url::parse("https://example.org/epata/feed.json").unwrap());
    assert_eq!(router.classify(&request), Strategy::Navigation);

    let cross_origin = Request::navigate(Url::parse("https://docs.google.com/forms/x").unwrap());
    assert_eq!(router.classify(&cross_origin), Strategy::Navigation);
}

#[test]
fn test_cross_origin_json_is_not_local_data() {
    let router = router();
    assert_eq!(
        router.classify(&get("https://cdn.example.net/manifest.json")),
        Strategy::Asset
    );
}

#[test]
fn test_excluded_host_is_remote_not_local() {
    let router = router();
    assert_eq!(
        router.classify(&get("https://raw.githubusercontent.com/o/r/main/list.json")),
        Strategy::AlwaysFresh
    );
}

#[test]
fn test_excluded_host_under_scope_origin() {
    let mut config = WorkerConfig::default();
    config.excluded_hosts = vec!["example.org".to_string()];
    let router = Router::new(&config, Url::parse("https://example.org/").unwrap());

    // Same origin, data suffix, but the host is excluded
    assert_eq!(
        router.classify(&get("https://example.org/data/courses.json")),
        Strategy::AlwaysFresh
    );
}

#[test]
fn test_non_get_is_bypassed() {
    let router = router();
    for method in [
        axum::http::Method::POST,
        axum::http::Method::PUT,
        axum::http::Method::DELETE,
    ] {
        let request = get("https://example.org/epata/data/courses.json").with_method(method);
        assert_eq!(router.classify(&request), Strategy::Bypass);
    }
}

#[test]
fn test_mode_not_url_decides_navigation() {
    let router = router();
    let request = get("https://example.org/epata/lesson.html").with_mode(RequestMode::SameOrigin);
    assert_eq!(router.classify(&request), Strategy::Asset);
}

#[test]
fn test_custom_data_extensions() {
    let mut config = WorkerConfig::default();
    config.data_extensions = vec![".csv".to_string(), ".JSON".to_string()];
    let router = Router::new(&config, Url::parse("https://example.org/").unwrap());

    assert_eq!(
        router.classify(&get("https://example.org/export.csv")),
        Strategy::RefreshBehind
    );
    assert_eq!(
        router.classify(&get("https://example.org/a.json")),
        Strategy::RefreshBehind
    );
}

#[test]
fn test_empty_host_lists_fall_through_to_asset() {
    let mut config = WorkerConfig::default();
    config.remote_hosts.clear();
    config.analytics_hosts.clear();
    config.excluded_hosts.clear();
    let router = Router::new(&config, Url::parse("https://example.org/").unwrap());
    assert_eq!(
        router.classify(&get("https://docs.google.com/x")),
        Strategy::Asset
    );
}

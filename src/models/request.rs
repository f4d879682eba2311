// Intercepted request model
// Author: kelexine (https://github.com/kelexine)

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// How the request was issued by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Full-page load or reload.
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

/// A fetch intercepted by the controller.
///
/// Every classification predicate reads `url`, the request's own target,
/// never the URL of the page that issued it.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Request {
    /// A plain `GET` in `cors` mode.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::Cors,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A top-level navigation to `url`.
    pub fn navigate(url: Url) -> Self {
        Self::get(url).with_mode(RequestMode::Navigate)
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Cache key: the full request URL.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Only `GET` responses may be stored.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == Method::GET
    }

    /// Scheme, host and port all match `scope`.
    pub fn is_same_origin(&self, scope: &Url) -> bool {
        self.url.origin() == scope.origin()
    }
}

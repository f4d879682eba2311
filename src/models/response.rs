// Response snapshot model
// Author: kelexine (https://github.com/kelexine)

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Immutable copy of a response.
///
/// Snapshots have no mutators: an entry in a partition is replaced wholesale
/// or deleted. Cloning shares the body buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    url: String,
    stored_at: Option<DateTime<Utc>>,
}

impl ResponseSnapshot {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            url: String::new(),
            stored_at: None,
        }
    }

    /// Rebuild a snapshot from its stored parts.
    pub fn from_parts(
        status: u16,
        headers: Vec<(String, String)>,
        body: Bytes,
        url: String,
        stored_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            url,
            stored_at,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Copy taken at insertion time.
    pub fn stamped(&self, at: DateTime<Utc>) -> Self {
        Self {
            stored_at: Some(at),
            ..self.clone()
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// 2xx, the only responses worth storing.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Lossy UTF-8 view of the body.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Final URL the response came from, empty for synthesized responses.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn stored_at(&self) -> Option<DateTime<Utc>> {
        self.stored_at
    }
}

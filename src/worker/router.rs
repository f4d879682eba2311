//! Request classification.
//!
//! The router is an ordered table of `(predicate, strategy)` rules evaluated
//! top to bottom; the first matching rule picks the strategy. The default
//! table is:
//!
//! | # | Predicate | Strategy |
//! |---|-----------|----------|
//! | 0 | method is not `GET` | [`Strategy::Bypass`] |
//! | 1 | navigation request | [`Strategy::Navigation`] |
//! | 2 | same-origin data file, host not excluded | [`Strategy::RefreshBehind`] |
//! | 3 | remote content host (or excluded host) | [`Strategy::AlwaysFresh`] |
//! | 4 | analytics host | [`Strategy::Bypass`] |
//! | 5 | anything else | [`Strategy::Asset`] |
//!
//! Predicates read the request's own URL, never the page's: data files,
//! spreadsheets and beacons routinely live on other origins.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::WorkerConfig;
use crate::models::Request;
use serde::Serialize;
use std::fmt;
use url::Url;

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Network first, app shell when offline.
    Navigation,
    /// Stale-while-revalidate.
    RefreshBehind,
    /// Network first or network only, per [`RemotePolicy`](crate::config::RemotePolicy).
    AlwaysFresh,
    /// Straight to the network, never stored.
    Bypass,
    /// Cache first.
    Asset,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Navigation => "navigation",
            Strategy::RefreshBehind => "refresh_behind",
            Strategy::AlwaysFresh => "always_fresh",
            Strategy::Bypass => "bypass",
            Strategy::Asset => "asset",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host pattern matching the host itself and all of its subdomains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern(String);

impl HostPattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.trim().trim_start_matches('.').to_ascii_lowercase())
    }

    /// `google.com` matches `google.com` and `docs.google.com`, not
    /// `evilgoogle.com`.
    pub fn matches(&self, host: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }
        let host = host.to_ascii_lowercase();
        host == self.0
            || (host.len() > self.0.len()
                && host.ends_with(&self.0)
                && host.as_bytes()[host.len() - self.0.len() - 1] == b'.')
    }
}

fn patterns(hosts: &[String]) -> Vec<HostPattern> {
    hosts.iter().map(|h| HostPattern::new(h)).collect()
}

fn any_host(patterns: &[HostPattern], host: Option<&str>) -> bool {
    host.map(|h| patterns.iter().any(|p| p.matches(h)))
        .unwrap_or(false)
}

/// Rule predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    NotGet,
    Navigation,
    /// Same-origin request whose path ends in one of the extensions and whose
    /// host is not excluded.
    LocalData {
        extensions: Vec<String>,
        excluded: Vec<HostPattern>,
    },
    /// Host matches any pattern.
    Host(Vec<HostPattern>),
    Always,
}

impl Predicate {
    pub fn matches(&self, request: &Request, scope: &Url) -> bool {
        match self {
            Predicate::NotGet => !request.is_cacheable_method(),
            Predicate::Navigation => request.is_navigation(),
            Predicate::LocalData {
                extensions,
                excluded,
            } => {
                let path = request.url.path().to_ascii_lowercase();
                request.is_same_origin(scope)
                    && !any_host(excluded, request.host())
                    && extensions.iter().any(|ext| path.ends_with(ext.as_str()))
            }
            Predicate::Host(patterns) => any_host(patterns, request.host()),
            Predicate::Always => true,
        }
    }
}

/// One row of the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub predicate: Predicate,
    pub strategy: Strategy,
}

impl Rule {
    pub fn new(predicate: Predicate, strategy: Strategy) -> Self {
        Self {
            predicate,
            strategy,
        }
    }
}

/// Ordered rule table bound to a scope.
#[derive(Debug, Clone)]
pub struct Router {
    scope: Url,
    rules: Vec<Rule>,
}

impl Router {
    /// Build the default table from a generation's settings.
    pub fn new(config: &WorkerConfig, scope: Url) -> Self {
        let excluded = patterns(&config.excluded_hosts);
        // Excluded hosts fall through to the remote rule rather than to assets
        let mut remote = patterns(&config.remote_hosts);
        remote.extend(excluded.iter().cloned());

        let extensions = config
            .data_extensions
            .iter()
            .map(|e| e.to_ascii_lowercase())
            .collect();

        let rules = vec![
            Rule::new(Predicate::NotGet, Strategy::Bypass),
            Rule::new(Predicate::Navigation, Strategy::Navigation),
            Rule::new(
                Predicate::LocalData {
                    extensions,
                    excluded,
                },
                Strategy::RefreshBehind,
            ),
            Rule::new(Predicate::Host(remote), Strategy::AlwaysFresh),
            Rule::new(
                Predicate::Host(patterns(&config.analytics_hosts)),
                Strategy::Bypass,
            ),
            Rule::new(Predicate::Always, Strategy::Asset),
        ];

        Self { scope, rules }
    }

    /// Insert a rule at `index`, ahead of everything after it.
    pub fn insert_rule(&mut self, index: usize, rule: Rule) {
        let index = index.min(self.rules.len());
        self.rules.insert(index, rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// First matching rule's strategy. An empty table classifies as
    /// [`Strategy::Asset`].
    pub fn classify(&self, request: &Request) -> Strategy {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(request, &self.scope))
            .map(|rule| rule.strategy)
            .unwrap_or(Strategy::Asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{prop_assert, proptest};

    #[test]
    fn test_host_pattern_subdomains() {
        let pattern = HostPattern::new("google.com");
        assert!(pattern.matches("google.com"));
        assert!(pattern.matches("docs.google.com"));
        assert!(pattern.matches("DOCS.Google.com"));
        assert!(!pattern.matches("evilgoogle.com"));
        assert!(!pattern.matches("google.com.evil.net"));
        assert!(!HostPattern::new("").matches("google.com"));
    }

    #[test]
    fn test_leading_dot_pattern() {
        assert!(HostPattern::new(".google-analytics.com").matches("www.google-analytics.com"));
    }

    proptest! {
        #[test]
        fn prop_any_subdomain_matches(label in "[a-z][a-z0-9-]{0,15}") {
            let pattern = HostPattern::new("githubusercontent.com");
            let host = format!("{}.githubusercontent.com", label);
            prop_assert!(pattern.matches(&host));
        }

        #[test]
        fn prop_glued_prefix_never_matches(label in "[a-z][a-z0-9]{0,15}") {
            let pattern = HostPattern::new("google.com");
            let host = format!("{}google.com", label);
            prop_assert!(!pattern.matches(&host));
        }
    }

    #[test]
    fn test_insert_rule_takes_precedence() {
        let scope = Url::parse("https://app.test/").unwrap();
        let mut router = Router::new(&WorkerConfig::default(), scope);
        router.insert_rule(
            0,
            Rule::new(
                Predicate::Host(vec![HostPattern::new("fonts.gstatic.com")]),
                Strategy::RefreshBehind,
            ),
        );
        let req = Request::get(Url::parse("https://fonts.gstatic.com/s/roboto.woff2").unwrap());
        assert_eq!(router.classify(&req), Strategy::RefreshBehind);
        assert_eq!(router.rules().len(), 7);
    }
}

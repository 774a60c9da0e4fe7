//! Search query representation.

use serde::{Deserialize, Serialize};

/// Default number of results requested from each engine.
pub const DEFAULT_NUM_RESULTS: usize = 10;

fn default_num_results() -> usize {
    DEFAULT_NUM_RESULTS
}

/// A search query with all parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search terms.
    pub query: String,
    /// Result count hint passed to each engine; engines may return fewer.
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    /// Restricts the search to these engine names. Empty means all enabled.
    #[serde(default)]
    pub engines: Vec<String>,
    /// Only keep results whose host is one of these domains.
    #[serde(default)]
    pub include_domains: Vec<String>,
    /// Drop results whose host is one of these domains.
    #[serde(default)]
    pub exclude_domains: Vec<String>,
}

impl SearchQuery {
    /// Creates a new search query with the given terms.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            num_results: DEFAULT_NUM_RESULTS,
            engines: Vec::new(),
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
        }
    }

    /// Sets the result count hint. Zero is bumped to one.
    pub fn with_num_results(mut self, num_results: usize) -> Self {
        self.num_results = num_results.max(1);
        self
    }

    /// Restricts the engines to use.
    pub fn with_engines(mut self, engines: Vec<String>) -> Self {
        self.engines = engines;
        self
    }

    /// Sets the domains to keep.
    pub fn with_include_domains(mut self, domains: Vec<String>) -> Self {
        self.include_domains = domains;
        self
    }

    /// Sets the domains to drop.
    pub fn with_exclude_domains(mut self, domains: Vec<String>) -> Self {
        self.exclude_domains = domains;
        self
    }

    /// Returns whether the query has no searchable terms.
    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_new() {
        let query = SearchQuery::new("rust programming");
        assert_eq!(query.query, "rust programming");
        assert_eq!(query.num_results, 10);
        assert!(query.engines.is_empty());
        assert!(query.include_domains.is_empty());
        assert!(query.exclude_domains.is_empty());
    }

    #[test]
    fn test_with_num_results_floor() {
        assert_eq!(SearchQuery::new("x").with_num_results(0).num_results, 1);
        assert_eq!(SearchQuery::new("x").with_num_results(25).num_results, 25);
    }

    #[test]
    fn test_builder_chain() {
        let query = SearchQuery::new("x")
            .with_engines(vec!["google".into()])
            .with_include_domains(vec!["rust-lang.org".into()])
            .with_exclude_domains(vec!["spam.com".into()]);
        assert_eq!(query.engines, vec!["google"]);
        assert_eq!(query.include_domains, vec!["rust-lang.org"]);
        assert_eq!(query.exclude_domains, vec!["spam.com"]);
    }

    #[test]
    fn test_is_blank() {
        assert!(SearchQuery::new("  \t\n").is_blank());
        assert!(!SearchQuery::new(" a ").is_blank());
    }

    #[test]
    fn test_deserialize_defaults() {
        let query: SearchQuery = serde_json::from_str(r#"{"query":"x"}"#).unwrap();
        assert_eq!(query.num_results, 10);
        assert!(query.engines.is_empty());
    }
}

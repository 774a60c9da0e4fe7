//! Search engine trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::fetcher_http::DEFAULT_REQUEST_TIMEOUT;
use crate::proxy::Proxy;
use crate::{Result, SearchResult};

/// Trait for implementing search engines.
///
/// An engine translates one query into one upstream request and parses the
/// response. Engines are expected to absorb their own network and parse
/// failures and return an empty list; the aggregator still treats an `Err`
/// as "no contribution" rather than failing the whole search.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Returns the engine name used to tag its results.
    fn name(&self) -> &str;

    /// Upper bound the aggregator allows this engine to run.
    fn timeout(&self) -> Duration {
        DEFAULT_REQUEST_TIMEOUT
    }

    /// Performs a search and returns at most `num_results` results.
    async fn search(
        &self,
        query: &str,
        num_results: usize,
        proxy: Option<&Proxy>,
    ) -> Result<Vec<SearchResult>>;
}

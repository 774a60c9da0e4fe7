//! Search orchestration across engines.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::config::Config;
use crate::engines::{self, canonical_name, BUILTIN_ENGINES};
use crate::postprocess::{LlmHooks, QueryPostProcessor};
use crate::proxy::ProxyPool;
use crate::{Engine, Result, SearchQuery, SearchResult};

struct EngineEntry {
    engine: Arc<dyn Engine>,
    enabled: bool,
}

/// Fans a query out to engines and concatenates their results.
///
/// Results keep engine declaration order, then each engine's own order.
/// Nothing is ranked or deduplicated. A failing, panicking or slow engine
/// contributes nothing and never fails the search.
pub struct Aggregator {
    engines: Vec<EngineEntry>,
    proxy_pool: Arc<ProxyPool>,
    post_processor: Option<Arc<dyn QueryPostProcessor>>,
    deadline: Option<Duration>,
    span: Span,
}

impl Aggregator {
    /// Creates an aggregator with no engines and no proxies.
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
            proxy_pool: Arc::new(ProxyPool::new()),
            post_processor: None,
            deadline: None,
            span: info_span!("aggregator"),
        }
    }

    /// Builds an aggregator from configuration.
    ///
    /// Engines named in `[search].engines` are enabled in that order. The
    /// rest of the catalog is registered disabled, so a query can still
    /// request them by name.
    pub async fn from_config(config: &Config) -> Self {
        let mut aggregator = Self::new();
        let timeout = config.search.timeout();

        for engine in engines::from_names(&config.search.engines, timeout) {
            aggregator.add_shared_engine(engine, true);
        }
        for info in BUILTIN_ENGINES {
            if aggregator.find(info.name).is_none() {
                if let Some(engine) = engines::from_name(info.name, timeout) {
                    aggregator.add_shared_engine(engine, false);
                }
            }
        }

        aggregator.set_proxy_pool(ProxyPool::load(&config.proxy).await);
        aggregator.set_deadline(config.search.deadline());
        if let Some(hooks) = LlmHooks::from_settings(&config.llm) {
            info!(provider = %hooks.provider(), "LLM post-processing enabled");
            aggregator.set_post_processor(hooks);
        }
        aggregator
    }

    /// Adds an enabled engine.
    pub fn add_engine<E: Engine + 'static>(&mut self, engine: E) {
        self.add_shared_engine(Arc::new(engine), true);
    }

    /// Adds an engine that only runs when a query names it.
    pub fn add_disabled_engine<E: Engine + 'static>(&mut self, engine: E) {
        self.add_shared_engine(Arc::new(engine), false);
    }

    pub fn add_shared_engine(&mut self, engine: Arc<dyn Engine>, enabled: bool) {
        debug!(engine = %engine.name(), enabled, "Registered engine");
        self.engines.push(EngineEntry { engine, enabled });
    }

    /// Sets the proxy pool consulted once per engine call.
    pub fn set_proxy_pool(&mut self, proxy_pool: ProxyPool) {
        self.proxy_pool = Arc::new(proxy_pool);
    }

    pub fn proxy_pool(&self) -> &ProxyPool {
        &self.proxy_pool
    }

    /// Installs query refinement and result summarization hooks.
    pub fn set_post_processor<P: QueryPostProcessor + 'static>(&mut self, processor: P) {
        self.post_processor = Some(Arc::new(processor));
    }

    /// Bounds the whole fan-out. Engines still running when it expires
    /// contribute nothing.
    pub fn set_deadline(&mut self, deadline: Option<Duration>) {
        self.deadline = deadline;
    }

    /// Returns the number of registered engines, enabled or not.
    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Returns the names of the enabled engines in declaration order.
    pub fn engine_names(&self) -> Vec<String> {
        self.engines
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.engine.name().to_string())
            .collect()
    }

    fn find(&self, name: &str) -> Option<&EngineEntry> {
        let wanted = name.trim().to_ascii_lowercase();
        let canonical = canonical_name(&wanted);
        self.engines.iter().find(|entry| {
            let own = entry.engine.name();
            own.eq_ignore_ascii_case(&wanted) || canonical.is_some_and(|c| c == own)
        })
    }

    /// Returns the engines a query would run.
    ///
    /// Without an engine list this is every enabled engine. With one, the
    /// named engines in the requested order, disabled ones included;
    /// unknown names are skipped with a warning.
    pub fn select_engines(&self, query: &SearchQuery) -> Vec<Arc<dyn Engine>> {
        if query.engines.is_empty() {
            return self
                .engines
                .iter()
                .filter(|entry| entry.enabled)
                .map(|entry| Arc::clone(&entry.engine))
                .collect();
        }

        let mut selected: Vec<Arc<dyn Engine>> = Vec::new();
        for name in &query.engines {
            match self.find(name) {
                Some(entry) => {
                    if !selected.iter().any(|e| Arc::ptr_eq(e, &entry.engine)) {
                        selected.push(Arc::clone(&entry.engine));
                    }
                }
                None => warn!(engine = %name, "Requested engine is not available"),
            }
        }
        selected
    }

    /// Runs `query` on the selected engines and returns the merged results.
    ///
    /// A blank query or an empty engine selection yields an empty list.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        async {
            if query.is_blank() {
                warn!("Empty query, nothing to search");
                return Ok(Vec::new());
            }

            let selected = self.select_engines(query);
            if selected.is_empty() {
                warn!("No engines enabled for this query");
                return Ok(Vec::new());
            }

            let start = Instant::now();
            let terms: Arc<str> = match &self.post_processor {
                Some(processor) => processor.refine_query(&query.query).await.into(),
                None => query.query.as_str().into(),
            };
            debug!(query = %terms, engines = selected.len(), "Dispatching");

            let names: Vec<String> = selected.iter().map(|e| e.name().to_string()).collect();
            let handles: Vec<_> = selected
                .into_iter()
                .map(|engine| {
                    let terms = Arc::clone(&terms);
                    let proxy = self.proxy_pool.get();
                    let num_results = query.num_results;
                    let limit = match self.deadline {
                        Some(deadline) => engine.timeout().min(deadline),
                        None => engine.timeout(),
                    };
                    tokio::spawn(
                        async move {
                            timeout(limit, engine.search(&terms, num_results, proxy.as_deref())).await
                        }
                        .in_current_span(),
                    )
                })
                .collect();

            let mut merged = Vec::new();
            for (name, outcome) in names.into_iter().zip(join_all(handles).await) {
                match outcome {
                    Ok(Ok(Ok(results))) => {
                        debug!(engine = %name, count = results.len(), "Engine finished");
                        merged.extend(
                            results
                                .into_iter()
                                .filter(|r| !r.url.trim().is_empty())
                                .map(|r| r.with_source(name.as_str())),
                        );
                    }
                    Ok(Ok(Err(e))) => warn!(engine = %name, error = %e, "Engine failed"),
                    Ok(Err(_)) => warn!(engine = %name, "Engine timed out"),
                    Err(e) => error!(engine = %name, error = %e, "Engine task aborted"),
                }
            }

            let merged = filter_domains(merged, query);
            let merged = match &self.post_processor {
                Some(processor) => processor.summarize_results(&terms, merged).await,
                None => merged,
            };

            info!(
                count = merged.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Search finished"
            );
            Ok(merged)
        }
        .instrument(self.span.clone())
        .await
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn filter_domains(results: Vec<SearchResult>, query: &SearchQuery) -> Vec<SearchResult> {
    if query.include_domains.is_empty() && query.exclude_domains.is_empty() {
        return results;
    }
    results
        .into_iter()
        .filter(|r| {
            query.include_domains.is_empty()
                || query.include_domains.iter().any(|d| r.matches_domain(d))
        })
        .filter(|r| !query.exclude_domains.iter().any(|d| r.matches_domain(d)))
        .collect()
}

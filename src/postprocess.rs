//! Query refinement and result summarization hooks.
//!
//! The hooks are capability points for LLM post-processing. The shipped
//! implementations return their input unchanged.

use async_trait::async_trait;
use tracing::debug;

use crate::config::LlmSettings;
use crate::SearchResult;

/// Hook pair run around a search.
#[async_trait]
pub trait QueryPostProcessor: Send + Sync {
    /// Rewrites the query before dispatch.
    async fn refine_query(&self, query: &str) -> String {
        query.to_string()
    }

    /// Post-processes the merged result list.
    async fn summarize_results(&self, _query: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
        results
    }
}

/// Processor that leaves everything unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl QueryPostProcessor for Passthrough {}

/// LLM-backed hooks, enabled when credentials are configured.
///
/// Neither hook calls the model yet; both are identity functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmHooks {
    provider: String,
    model: String,
}

impl LlmHooks {
    /// Returns hooks when `[llm]` carries an API key, `None` otherwise.
    pub fn from_settings(settings: &LlmSettings) -> Option<Self> {
        settings.api_key.as_ref()?;
        Some(Self {
            provider: settings.provider.clone().unwrap_or_else(|| "openai".to_string()),
            model: settings.model.clone().unwrap_or_default(),
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl QueryPostProcessor for LlmHooks {
    async fn refine_query(&self, query: &str) -> String {
        debug!(provider = %self.provider, model = %self.model, "Query refinement");
        query.to_string()
    }

    async fn summarize_results(&self, _query: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
        debug!(provider = %self.provider, count = results.len(), "Result summarization");
        results
    }
}

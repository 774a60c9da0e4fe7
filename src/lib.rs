//! # metafind
//!
//! A multi-engine web search aggregator.
//!
//! A query is sent concurrently to every enabled engine, each request
//! optionally routed through a proxy drawn at random from a pool. The
//! per-engine results are tagged with their engine name and concatenated
//! in engine declaration order. Nothing is ranked or deduplicated.
//!
//! Every built-in engine is one generic [`engines::WebEngine`] configured
//! by an [`engines::EngineSpec`], so adding a provider means adding a
//! catalog entry rather than a new type.
//!
//! ## Example
//!
//! ```rust,no_run
//! use metafind::{Aggregator, Config, SearchQuery};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None);
//!     let aggregator = Aggregator::from_config(&config).await;
//!
//!     let query = SearchQuery::new("rust programming").with_num_results(5);
//!     for result in aggregator.search(&query).await? {
//!         println!("[{}] {}: {}", result.source, result.title, result.url);
//!     }
//!     Ok(())
//! }
//! ```

mod aggregator;
mod engine;
mod error;
mod query;
mod result;
mod user_agent;

pub mod config;
pub mod engines;
pub mod fetcher;
pub mod fetcher_http;
pub mod output;
pub mod postprocess;
pub mod proxy;
pub mod server;

pub use aggregator::Aggregator;
pub use config::Config;
pub use engine::Engine;
pub use error::{Result, SearchError};
pub use fetcher::{HttpMethod, PageFetcher, PageRequest};
pub use fetcher_http::HttpFetcher;
pub use postprocess::{LlmHooks, Passthrough, QueryPostProcessor};
pub use proxy::{Proxy, ProxyPool};
pub use query::SearchQuery;
pub use result::SearchResult;

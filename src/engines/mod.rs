//! Search engine implementations.
//!
//! Every provider is a [`WebEngine`] built from an [`EngineSpec`]; the
//! [`catalog`] module holds the built-in specs.

pub mod catalog;
pub mod extract;
mod web;

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

pub use catalog::{builtin, canonical_name, EngineInfo, BUILTIN_ENGINES};
pub use extract::{Extractor, HtmlExtractor, JsonExtractor, LinkRewrite};
pub use web::{EngineSpec, ParamMap, WebEngine};

use crate::Engine;

/// Builds a built-in engine by name or alias with the given timeout.
pub fn from_name(name: &str, timeout: Duration) -> Option<Arc<dyn Engine>> {
    builtin(name).map(|spec| Arc::new(WebEngine::new(spec.timeout(timeout))) as Arc<dyn Engine>)
}

/// Resolves engine names to engines, skipping unknown names with a warning.
///
/// Duplicates (including an alias next to its canonical name) are kept once.
pub fn from_names<S: AsRef<str>>(names: &[S], timeout: Duration) -> Vec<Arc<dyn Engine>> {
    let mut seen: Vec<&'static str> = Vec::new();
    let mut engines = Vec::new();
    for name in names {
        let name = name.as_ref();
        match canonical_name(name) {
            Some(canonical) if seen.contains(&canonical) => {}
            Some(canonical) => {
                seen.push(canonical);
                if let Some(engine) = from_name(canonical, timeout) {
                    engines.push(engine);
                }
            }
            None => warn!(engine = %name, "Unknown engine, skipping"),
        }
    }
    engines
}

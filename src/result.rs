//! Search result types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// A single search result.
///
/// `source` is left empty by engines and stamped by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title.
    pub title: String,
    /// Absolute result URL.
    pub url: String,
    /// Result description/snippet.
    #[serde(default)]
    pub snippet: String,
    /// Name of the engine that produced this result.
    #[serde(default)]
    pub source: String,
    /// Thumbnail or preview image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Provider-specific fields kept for debugging.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub raw: Map<String, Value>,
}

impl SearchResult {
    /// Creates a new search result.
    pub fn new(url: impl Into<String>, title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            ..Default::default()
        }
    }

    /// Sets the source engine tag.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Sets the image URL.
    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Stores a provider-specific field.
    pub fn with_raw(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.raw.insert(key.into(), value.into());
        self
    }

    /// Returns the lowercase host of the result URL, if it parses.
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_lowercase()))
    }

    /// Returns whether the result's host is `domain` or one of its subdomains.
    pub fn matches_domain(&self, domain: &str) -> bool {
        let domain = domain.trim().trim_start_matches("www.").to_lowercase();
        if domain.is_empty() {
            return false;
        }
        match self.host() {
            Some(host) => host == domain || host.ends_with(&format!(".{domain}")),
            None => false,
        }
    }
}

/// Resolves an href found in a result page to an absolute http(s) URL.
///
/// Protocol-relative links get `https:`; relative paths are joined onto
/// `base`. Anything that does not end up as http or https is rejected.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = if let Some(rest) = href.strip_prefix("//") {
        Url::parse(&format!("https://{rest}")).ok()?
    } else {
        match Url::parse(href) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => base.join(href).ok()?,
            Err(_) => return None,
        }
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

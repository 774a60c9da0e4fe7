//! Result extraction rules.
//!
//! An [`Extractor`] turns a provider's response body into result records.
//! HTML providers use CSS selectors, JSON providers use dotted field paths.

use std::fmt;

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use url::Url;

use crate::result::resolve_url;
use crate::{Result, SearchError, SearchResult};

/// Strategy that extracts result records from a response body.
pub trait Extractor: Send + Sync + fmt::Debug {
    /// Parses `body`; relative links are resolved against `base`.
    fn extract(&self, body: &str, base: &Url) -> Result<Vec<SearchResult>>;
}

/// Unwraps provider redirect links to the target URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkRewrite {
    #[default]
    None,
    /// `https://duckduckgo.com/l/?uddg=<target>`
    DuckDuckGo,
    /// `https://www.google.com/url?q=<target>`
    Google,
    /// `https://r.search.yahoo.com/.../RU=<target>/RK=...`
    Yahoo,
}

impl LinkRewrite {
    /// Returns the target of a redirect link, or `url` unchanged.
    pub fn apply(&self, url: String) -> String {
        let target = match self {
            Self::None => None,
            Self::DuckDuckGo => query_target(&url, |host, path| {
                host.ends_with("duckduckgo.com") && path.starts_with("/l/")
            }, &["uddg"]),
            Self::Google => query_target(&url, |host, path| {
                host.contains("google.") && path == "/url"
            }, &["q", "url"]),
            Self::Yahoo => yahoo_target(&url),
        };
        target.filter(|t| t.starts_with("http")).unwrap_or(url)
    }
}

fn query_target(url: &str, is_redirect: impl Fn(&str, &str) -> bool, keys: &[&str]) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !is_redirect(parsed.host_str()?, parsed.path()) {
        return None;
    }
    keys.iter().find_map(|key| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    })
}

fn yahoo_target(url: &str) -> Option<String> {
    let start = url.find("/RU=")? + 4;
    let rest = &url[start..];
    let end = rest.find("/R").unwrap_or(rest.len());
    urlencoding::decode(&rest[..end]).ok().map(|s| s.into_owned())
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector '{}': {:?}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes markup from a snippet fragment, e.g. `<span class="searchmatch">`.
fn strip_tags(fragment: &str) -> String {
    if !fragment.contains('<') {
        return fragment.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    let parsed = Html::parse_fragment(fragment);
    element_text(parsed.root_element())
}

/// CSS-selector extraction for HTML result pages.
///
/// Each `container` match is one candidate result. A record is emitted only
/// when both the title and link selectors match inside the container.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlExtractor {
    container: String,
    title: String,
    link: String,
    snippet: Option<String>,
    image: Option<String>,
    rewrite: LinkRewrite,
}

impl HtmlExtractor {
    /// Creates a rule from the container, title and link selectors.
    pub fn new(container: impl Into<String>, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            title: title.into(),
            link: link.into(),
            snippet: None,
            image: None,
            rewrite: LinkRewrite::None,
        }
    }

    /// Sets the snippet selector.
    pub fn snippet(mut self, css: impl Into<String>) -> Self {
        self.snippet = Some(css.into());
        self
    }

    /// Sets the image selector; the `src` or `data-src` attribute is used.
    pub fn image(mut self, css: impl Into<String>) -> Self {
        self.image = Some(css.into());
        self
    }

    /// Sets the redirect unwrapping rule for links.
    pub fn rewrite(mut self, rewrite: LinkRewrite) -> Self {
        self.rewrite = rewrite;
        self
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, body: &str, base: &Url) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(body);
        let container_selector = selector(&self.container)?;
        let title_selector = selector(&self.title)?;
        let link_selector = selector(&self.link)?;
        let snippet_selector = self.snippet.as_deref().map(selector).transpose()?;
        let image_selector = self.image.as_deref().map(selector).transpose()?;

        let mut results = Vec::new();

        for element in document.select(&container_selector) {
            let title = match element.select(&title_selector).next() {
                Some(el) => element_text(el),
                None => continue,
            };

            let href = match element
                .select(&link_selector)
                .find_map(|el| el.value().attr("href"))
            {
                Some(href) => href,
                None => continue,
            };

            let url = match resolve_url(base, href) {
                Some(url) => self.rewrite.apply(url),
                None => continue,
            };

            let snippet = snippet_selector
                .as_ref()
                .and_then(|sel| element.select(sel).next())
                .map(element_text)
                .unwrap_or_default();

            let image_url = image_selector
                .as_ref()
                .and_then(|sel| element.select(sel).next())
                .and_then(|el| el.value().attr("src").or_else(|| el.value().attr("data-src")))
                .and_then(|src| resolve_url(base, src));

            let mut result = SearchResult::new(url, title, snippet)
                .with_raw("position", results.len() + 1);
            result.image_url = image_url;
            results.push(result);
        }

        Ok(results)
    }
}

/// Field-path extraction for JSON APIs.
///
/// Paths are dot separated; numeric segments index into arrays. When a
/// link template is set, the `url` field value is substituted for `{}`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonExtractor {
    items: String,
    title: String,
    url: String,
    snippet: Option<String>,
    image: Option<String>,
    link_template: Option<String>,
}

impl JsonExtractor {
    /// Creates a rule reading an array at `items` with `title`/`url` fields.
    pub fn new(items: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            items: items.into(),
            title: title.into(),
            url: url.into(),
            snippet: None,
            image: None,
            link_template: None,
        }
    }

    pub fn snippet(mut self, path: impl Into<String>) -> Self {
        self.snippet = Some(path.into());
        self
    }

    pub fn image(mut self, path: impl Into<String>) -> Self {
        self.image = Some(path.into());
        self
    }

    /// Builds links from a template such as `https://en.wikipedia.org/wiki/{}`.
    pub fn link_template(mut self, template: impl Into<String>) -> Self {
        self.link_template = Some(template.into());
        self
    }

    fn link(&self, value: &str) -> String {
        match self.link_template.as_deref() {
            Some(template) => {
                let slug = value.replace(' ', "_");
                template.replace("{}", &urlencoding::encode(&slug))
            }
            None => value.to_string(),
        }
    }
}

/// Looks up a dotted path such as `query.search` or `items.0.link`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Extractor for JsonExtractor {
    fn extract(&self, body: &str, base: &Url) -> Result<Vec<SearchResult>> {
        let document: Value = serde_json::from_str(body)
            .map_err(|e| SearchError::Parse(format!("invalid JSON: {}", e)))?;

        let items = lookup(&document, &self.items)
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::Parse(format!("no array at '{}'", self.items)))?;

        let modeled: Vec<&str> = [Some(&self.title), Some(&self.url), self.snippet.as_ref(), self.image.as_ref()]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();

        let mut results = Vec::new();
        for item in items {
            let title = match lookup(item, &self.title).and_then(as_text) {
                Some(title) => strip_tags(&title),
                None => continue,
            };
            let url = match lookup(item, &self.url)
                .and_then(as_text)
                .and_then(|link| resolve_url(base, &self.link(&link)))
            {
                Some(url) => url,
                None => continue,
            };

            let snippet = self
                .snippet
                .as_deref()
                .and_then(|path| lookup(item, path))
                .and_then(as_text)
                .map(|s| strip_tags(&s))
                .unwrap_or_default();

            let image_url = self
                .image
                .as_deref()
                .and_then(|path| lookup(item, path))
                .and_then(as_text)
                .and_then(|src| resolve_url(base, &src));

            let raw: Map<String, Value> = item
                .as_object()
                .map(|fields| {
                    fields
                        .iter()
                        .filter(|(key, _)| !modeled.contains(&key.as_str()))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default();

            let mut result = SearchResult::new(url, title, snippet);
            result.image_url = image_url;
            result.raw = raw;
            results.push(result);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://search.example.com/search?q=rust").unwrap()
    }

    const PAGE: &str = r#"
        <html><body>
          <div class="r">
            <h3><a href="https://www.rust-lang.org/">Rust   Programming
              Language</a></h3>
            <p class="s">A language empowering <b>everyone</b>.</p>
            <img class="thumb" src="/img/rust.png">
          </div>
          <div class="r">
            <h3><a href="/relative/page">Relative</a></h3>
          </div>
          <div class="r">
            <p class="s">No title or link here</p>
          </div>
          <div class="r">
            <h3>Title without link</h3>
          </div>
          <div class="r">
            <h3><a href="javascript:void(0)">Script link</a></h3>
          </div>
        </body></html>
    "#;

    fn rule() -> HtmlExtractor {
        HtmlExtractor::new("div.r", "h3", "h3 a")
            .snippet("p.s")
            .image("img.thumb")
    }

    #[test]
    fn test_html_extracts_complete_records() {
        let results = rule().extract(PAGE, &base()).unwrap();
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert_eq!(results[0].snippet, "A language empowering everyone.");
        assert_eq!(
            results[0].image_url.as_deref(),
            Some("https://search.example.com/img/rust.png")
        );
        assert_eq!(results[0].raw.get("position"), Some(&json!(1)));
        assert!(results[0].source.is_empty());
    }

    #[test]
    fn test_html_inline_markup_keeps_words_intact() {
        let page = r#"
            <div class="r">
              <h3><a href="https://rustacean.net/">Rust<b>acean</b></a></h3>
              <p class="s"><b>Rust</b>'s borrow checker, <em>fast</em>.</p>
            </div>
        "#;
        let results = rule().extract(page, &base()).unwrap();
        assert_eq!(results[0].title, "Rustacean");
        assert_eq!(results[0].snippet, "Rust's borrow checker, fast.");
    }

    #[test]
    fn test_json_snippet_markup_keeps_words_intact() {
        let body = json!({"items": [
            {"title": "Rust<b>acean</b>", "link": "https://rustacean.net/", "about": "<span>Ferris</span>, the crab."}
        ]})
        .to_string();
        let rule = JsonExtractor::new("items", "title", "link").snippet("about");
        let results = rule.extract(&body, &base()).unwrap();
        assert_eq!(results[0].title, "Rustacean");
        assert_eq!(results[0].snippet, "Ferris, the crab.");
    }

    #[test]
    fn test_html_missing_snippet_defaults_empty() {
        let results = rule().extract(PAGE, &base()).unwrap();
        assert_eq!(results[1].url, "https://search.example.com/relative/page");
        assert_eq!(results[1].snippet, "");
        assert!(results[1].image_url.is_none());
    }

    #[test]
    fn test_html_empty_page() {
        let results = rule().extract("<html><body></body></html>", &base()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_html_invalid_selector_is_parse_error() {
        let result = HtmlExtractor::new("div[", "h3", "a").extract(PAGE, &base());
        assert!(matches!(result, Err(SearchError::Parse(_))));
    }

    #[test]
    fn test_rewrite_duckduckgo() {
        let url = "https://duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc".to_string();
        assert_eq!(LinkRewrite::DuckDuckGo.apply(url), "https://example.com/page");
    }

    #[test]
    fn test_rewrite_google() {
        let url = "https://www.google.com/url?q=https://example.com/a&sa=U".to_string();
        assert_eq!(LinkRewrite::Google.apply(url), "https://example.com/a");
    }

    #[test]
    fn test_rewrite_yahoo() {
        let url = "https://r.search.yahoo.com/_ylt=A;_ylu=B/RV=2/RE=1/RO=10/RU=https%3a%2f%2fexample.com%2f/RK=2/RS=x".to_string();
        assert_eq!(LinkRewrite::Yahoo.apply(url), "https://example.com/");
    }

    #[test]
    fn test_rewrite_leaves_plain_links() {
        let url = "https://example.com/?q=1".to_string();
        assert_eq!(LinkRewrite::Google.apply(url.clone()), url);
        assert_eq!(LinkRewrite::None.apply(url.clone()), url);
    }

    #[test]
    fn test_html_rewrite_relative_ddg_link() {
        let page = r#"<div class="result"><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.org%2F">Example</a></div>"#;
        let rule = HtmlExtractor::new(".result", ".result__a", ".result__a").rewrite(LinkRewrite::DuckDuckGo);
        let results = rule.extract(page, &base()).unwrap();
        assert_eq!(results[0].url, "https://example.org/");
    }

    #[test]
    fn test_lookup_paths() {
        let doc = json!({"query": {"search": [{"title": "A"}, {"title": "B"}]}});
        assert_eq!(lookup(&doc, "query.search.1.title"), Some(&json!("B")));
        assert!(lookup(&doc, "query.missing").is_none());
        assert_eq!(lookup(&doc, ""), Some(&doc));
    }

    #[test]
    fn test_json_extracts_with_template() {
        let body = json!({
            "query": {"search": [
                {"title": "Rust (programming language)", "snippet": "<span class=\"searchmatch\">Rust</span> is fast", "pageid": 29414838},
                {"snippet": "no title"},
                {"title": "Cargo", "snippet": "Package manager", "pageid": 1}
            ]}
        })
        .to_string();
        let rule = JsonExtractor::new("query.search", "title", "title")
            .snippet("snippet")
            .link_template("https://en.wikipedia.org/wiki/{}");
        let results = rule.extract(&body, &base()).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust (programming language)");
        assert_eq!(
            results[0].url,
            "https://en.wikipedia.org/wiki/Rust_%28programming_language%29"
        );
        assert_eq!(results[0].snippet, "Rust is fast");
        assert_eq!(results[0].raw.get("pageid"), Some(&json!(29414838)));
        assert!(!results[0].raw.contains_key("title"));
    }

    #[test]
    fn test_json_direct_links_and_images() {
        let body = json!({"items": [
            {"name": "One", "link": "https://one.example/", "thumb": "/t/1.png"},
            {"name": "Two", "link": "mailto:nobody@example.com"}
        ]})
        .to_string();
        let rule = JsonExtractor::new("items", "name", "link").image("thumb");
        let results = rule.extract(&body, &base()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://one.example/");
        assert_eq!(
            results[0].image_url.as_deref(),
            Some("https://search.example.com/t/1.png")
        );
    }

    #[test]
    fn test_json_invalid_body() {
        let rule = JsonExtractor::new("items", "title", "url");
        assert!(matches!(rule.extract("<html>", &base()), Err(SearchError::Parse(_))));
        assert!(matches!(rule.extract(r#"{"other": []}"#, &base()), Err(SearchError::Parse(_))));
    }
}

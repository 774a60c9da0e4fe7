//! Built-in provider catalog.

use super::extract::{HtmlExtractor, JsonExtractor, LinkRewrite};
use super::web::EngineSpec;

/// Name and one-line description of a built-in engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

/// Every built-in engine, in listing order.
pub const BUILTIN_ENGINES: &[EngineInfo] = &[
    EngineInfo { name: "google", aliases: &["g"], description: "Google web search" },
    EngineInfo { name: "bing", aliases: &[], description: "Microsoft Bing" },
    EngineInfo { name: "duckduckgo", aliases: &["ddg"], description: "DuckDuckGo HTML endpoint" },
    EngineInfo { name: "yahoo", aliases: &[], description: "Yahoo Search" },
    EngineInfo { name: "baidu", aliases: &[], description: "Baidu (百度)" },
    EngineInfo { name: "ecosia", aliases: &[], description: "Ecosia" },
    EngineInfo { name: "brave", aliases: &[], description: "Brave Search" },
    EngineInfo { name: "mojeek", aliases: &[], description: "Mojeek independent index" },
    EngineInfo { name: "startpage", aliases: &[], description: "Startpage (Google results, no tracking)" },
    EngineInfo { name: "wikipedia", aliases: &["wiki"], description: "Wikipedia search API" },
];

/// Maps an engine name or alias to its canonical catalog name.
///
/// Matching is case-insensitive; unknown names yield `None`.
pub fn canonical_name(name: &str) -> Option<&'static str> {
    let name = name.trim().to_ascii_lowercase();
    BUILTIN_ENGINES
        .iter()
        .find(|info| info.name == name || info.aliases.contains(&name.as_str()))
        .map(|info| info.name)
}

/// Returns the spec of a built-in engine by name or alias.
pub fn builtin(name: &str) -> Option<EngineSpec> {
    let spec = match canonical_name(name)? {
        "google" => EngineSpec::new(
            "google",
            "https://www.google.com/search",
            "q",
            HtmlExtractor::new("div.g", "h3", "a[href]")
                .snippet("div[data-sncf], div.VwiC3b")
                .rewrite(LinkRewrite::Google),
        )
        .count_param("num")
        .count_cap(100)
        .extra_param("hl", "en")
        .block_marker("/sorry/index")
        .block_marker("recaptcha"),

        "bing" => EngineSpec::new(
            "bing",
            "https://www.bing.com/search",
            "q",
            HtmlExtractor::new("li.b_algo", "h2", "h2 a").snippet(".b_caption p, .b_lineclamp2"),
        )
        .count_param("count")
        .count_cap(50),

        "duckduckgo" => EngineSpec::new(
            "duckduckgo",
            "https://html.duckduckgo.com/html/",
            "q",
            HtmlExtractor::new(".result:not(.result--ad)", ".result__a", ".result__a")
                .snippet(".result__snippet")
                .rewrite(LinkRewrite::DuckDuckGo),
        )
        .post()
        .block_marker("anomaly-modal"),

        "yahoo" => EngineSpec::new(
            "yahoo",
            "https://search.yahoo.com/search",
            "p",
            HtmlExtractor::new("div.algo", "h3", "h3 a")
                .snippet(".compText")
                .rewrite(LinkRewrite::Yahoo),
        )
        .count_param("n")
        .count_cap(100),

        "baidu" => EngineSpec::new(
            "baidu",
            "https://www.baidu.com/s",
            "wd",
            HtmlExtractor::new("div.result, div.c-container", "h3 a, .t a", "h3 a, .t a")
                .snippet(".c-abstract, .c-span-last, .content-right_8Zs40"),
        )
        .count_param("rn")
        .count_cap(50)
        .block_marker("wappass.baidu.com"),

        "ecosia" => EngineSpec::new(
            "ecosia",
            "https://www.ecosia.org/search",
            "q",
            HtmlExtractor::new("div.result", "a.result__link, h2", "a.result__link, a[href]")
                .snippet(".result__description, p"),
        )
        .extra_param("method", "index"),

        "brave" => EngineSpec::new(
            "brave",
            "https://search.brave.com/search",
            "q",
            HtmlExtractor::new(
                r#"div.snippet[data-type="web"]"#,
                ".search-snippet-title, .title",
                r#"a[href^="http"]"#,
            )
            .snippet(".generic-snippet .content, .snippet-description"),
        )
        .extra_param("source", "web"),

        "mojeek" => EngineSpec::new(
            "mojeek",
            "https://www.mojeek.com/search",
            "q",
            HtmlExtractor::new("ul.results-standard li", "h2 a, a.title", "h2 a, a.title").snippet("p.s"),
        ),

        "startpage" => EngineSpec::new(
            "startpage",
            "https://www.startpage.com/do/search",
            "query",
            HtmlExtractor::new(".w-gl__result", ".w-gl__result-title", "a.w-gl__result-title, a")
                .snippet(".w-gl__description"),
        )
        .extra_param("cat", "web"),

        "wikipedia" => EngineSpec::new(
            "wikipedia",
            "https://en.wikipedia.org/w/api.php",
            "srsearch",
            JsonExtractor::new("query.search", "title", "title")
                .snippet("snippet")
                .link_template("https://en.wikipedia.org/wiki/{}"),
        )
        .count_param("srlimit")
        .count_cap(50)
        .extra_param("action", "query")
        .extra_param("list", "search")
        .extra_param("format", "json")
        .accept("application/json"),

        _ => return None,
    };
    Some(spec)
}

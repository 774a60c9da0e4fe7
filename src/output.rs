//! Rendering result lists for the terminal.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::{Result, SearchError, SearchResult};

const SNIPPET_WIDTH: usize = 150;

/// Output format of the `search` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable numbered list.
    #[default]
    Text,
    /// Pretty-printed JSON array of records.
    Json,
    /// `title,url,snippet,source` rows with a header.
    Csv,
    /// Markdown numbered list.
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!(
                "unknown output format '{other}' (expected text, json, csv or markdown)"
            )),
        }
    }
}

/// Renders `results` for `query` in the given format.
pub fn render(results: &[SearchResult], query: &str, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(results, query)),
        OutputFormat::Json => serde_json::to_string_pretty(results)
            .map_err(|e| SearchError::Other(format!("Failed to serialize results: {e}"))),
        OutputFormat::Csv => Ok(render_csv(results)),
        OutputFormat::Markdown => Ok(render_markdown(results, query)),
    }
}

fn truncate(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn render_text(results: &[SearchResult], query: &str) -> String {
    let mut out = String::new();
    if results.is_empty() {
        let _ = writeln!(out, "No results for \"{query}\".");
        return out;
    }

    let _ = writeln!(out, "Search results for \"{}\" ({} results):\n", query, results.len());
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, result.title);
        let _ = writeln!(out, "   URL: {}", result.url);
        if !result.snippet.is_empty() {
            let _ = writeln!(out, "   {}", truncate(&result.snippet, SNIPPET_WIDTH));
        }
        let _ = writeln!(out, "   Source: {}", result.source);
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_csv(results: &[SearchResult]) -> String {
    let mut out = String::from("title,url,snippet,source\n");
    for result in results {
        let row = [&result.title, &result.url, &result.snippet, &result.source]
            .iter()
            .map(|field| csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn markdown_text(value: &str) -> String {
    value.replace('[', "\\[").replace(']', "\\]")
}

fn render_markdown(results: &[SearchResult], query: &str) -> String {
    let mut out = format!("## Results for \"{}\"\n\n", markdown_text(query));
    if results.is_empty() {
        out.push_str("_No results._\n");
        return out;
    }
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. [{}]({}) `{}`",
            i + 1,
            markdown_text(&result.title),
            result.url.replace(')', "%29"),
            result.source
        );
        if !result.snippet.is_empty() {
            let _ = writeln!(out, "   {}", markdown_text(&truncate(&result.snippet, SNIPPET_WIDTH)));
        }
    }
    out
}

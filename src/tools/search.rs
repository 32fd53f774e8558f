//! Web search tool backed by DuckDuckGo's HTML frontend.

use std::time::Duration;

use async_trait::async_trait;

use super::{ReturnType, Tool};

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; toolflow/0.1)";

/// Search the web; no API key required.
pub struct WebSearch {
    result_limit: usize,
}

impl WebSearch {
    pub fn new(result_limit: usize) -> Self {
        Self {
            result_limit: result_limit.max(1),
        }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current or general knowledge. Input: the search query text."
    }

    fn return_type(&self) -> ReturnType {
        ReturnType::Str
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        let query = input.trim();
        if query.is_empty() {
            anyhow::bail!("search query is empty");
        }

        let url = format!("{}?q={}", SEARCH_ENDPOINT, urlencoding::encode(query));
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        let response = client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("search request failed: HTTP {}", status);
        }

        let html = response.text().await?;
        let results = extract_results(&html, self.result_limit);

        if results.is_empty() {
            Ok(format!("No results found for: {}", query))
        } else {
            Ok(results.join("\n\n"))
        }
    }
}

/// Pull result titles and snippets out of the DuckDuckGo HTML page.
fn extract_results(html: &str, limit: usize) -> Vec<String> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__body\"").skip(1) {
        if results.len() == limit {
            break;
        }
        let title = element_text(chunk, "class=\"result__a\"", "</a>");
        let snippet = element_text(chunk, "class=\"result__snippet\"", "</a>")
            .or_else(|| element_text(chunk, "class=\"result__snippet\"", "</span>"));

        match (title, snippet) {
            (Some(title), Some(snippet)) => results.push(format!("{}: {}", title, snippet)),
            (Some(title), None) => results.push(title),
            _ => {}
        }
    }

    results
}

/// Text content of the element whose opening tag contains `marker`, up to
/// `close_tag`, with nested markup stripped.
fn element_text(chunk: &str, marker: &str, close_tag: &str) -> Option<String> {
    let after = chunk.split(marker).nth(1)?;
    let start = after.find('>')? + 1;
    let end = after[start..].find(close_tag)? + start;
    let text = strip_tags(&after[start..end]);
    if text.is_empty() {
        None
    } else {
        Some(html_decode(&text))
    }
}

/// Drop anything between `<` and `>`, collapse whitespace.
fn strip_tags(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = concat!(
        "<div class=\"result__body\">",
        "<a class=\"result__a\" href=\"/a\">Rust <b>language</b></a>",
        "<a class=\"result__snippet\" href=\"/a\">A systems language &amp; more</a>",
        "</div>",
        "<div class=\"result__body\">",
        "<a class=\"result__a\" href=\"/b\">Second hit</a>",
        "<a class=\"result__snippet\" href=\"/b\">Details here</a>",
        "</div>",
    );

    #[test]
    fn extracts_title_and_snippet() {
        let results = extract_results(PAGE, 5);
        assert_eq!(
            results,
            vec![
                "Rust language: A systems language & more".to_string(),
                "Second hit: Details here".to_string(),
            ]
        );
    }

    #[test]
    fn respects_the_result_limit() {
        let results = extract_results(PAGE, 1);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn no_result_markup_yields_nothing() {
        assert!(extract_results("<html><body>nope</body></html>", 3).is_empty());
    }

    #[test]
    fn strips_nested_tags_and_decodes_entities() {
        assert_eq!(strip_tags("a <b>bold</b>  move"), "a bold move");
        assert_eq!(html_decode("4 &lt; 5 &amp;&nbsp;true"), "4 < 5 & true");
    }
}

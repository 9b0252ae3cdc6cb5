//! DuckDuckGo web search over the HTML results page

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use crate::domain::web_search::{WebSearchOutcome, WebSearchProvider};
use crate::domain::DomainError;
use crate::infrastructure::http_client::HttpClientTrait;

pub const DEFAULT_DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";

const DEFAULT_MAX_RESULTS: usize = 3;

static RESULT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.result").expect("result selector is valid"));
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result__a").expect("title selector is valid"));
static SNIPPET: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".result__snippet").expect("snippet selector is valid"));

/// One organic search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

impl SearchHit {
    fn render(&self) -> String {
        format!(
            "snippet: {}, title: {}, link: {}",
            self.snippet, self.title, self.link
        )
    }
}

/// Web search backed by DuckDuckGo's HTML results page.
///
/// The top `max_results` organic results are rendered one per line as
/// `snippet: ..., title: ..., link: ...`. Ads are skipped.
#[derive(Debug)]
pub struct DuckDuckGoSearch<C: HttpClientTrait> {
    client: C,
    base_url: String,
    max_results: usize,
}

impl<C: HttpClientTrait> DuckDuckGoSearch<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            base_url: DEFAULT_DUCKDUCKGO_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }
}

/// Parse organic results out of a results page, in page order
pub(crate) fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);

    document
        .select(&RESULT)
        .filter(|result| !result.value().classes().any(|c| c == "result--ad"))
        .filter_map(|result| {
            let anchor = result.select(&TITLE).next()?;
            let title = element_text(&anchor);
            let link = resolve_link(anchor.value().attr("href")?);
            let snippet = result
                .select(&SNIPPET)
                .next()
                .map(|s| element_text(&s))
                .unwrap_or_default();

            (!title.is_empty() || !snippet.is_empty()).then_some(SearchHit {
                title,
                snippet,
                link,
            })
        })
        .take(limit)
        .collect()
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result links go through a `/l/?uddg=<target>` redirect; return the target
fn resolve_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };

    match reqwest::Url::parse(&absolute) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned())
            .unwrap_or(absolute),
        Err(_) => absolute,
    }
}

#[async_trait]
impl<C: HttpClientTrait + 'static> WebSearchProvider for DuckDuckGoSearch<C> {
    #[instrument(skip(self), fields(provider = "duckduckgo"))]
    async fn search(&self, query: &str) -> Result<WebSearchOutcome, DomainError> {
        let page = self.client.get_text(&self.base_url, &[("q", query)]).await?;
        let hits = parse_results(&page, self.max_results);

        debug!("DuckDuckGo returned {} results", hits.len());

        if hits.is_empty() {
            return Ok(WebSearchOutcome::Failed(format!(
                "No web results found for '{}'",
                query
            )));
        }

        let text = hits
            .iter()
            .map(SearchHit::render)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(WebSearchOutcome::Results(text))
    }

    fn provider_name(&self) -> &'static str {
        "duckduckgo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::mock::MockHttpClient;
    use crate::infrastructure::http_client::HttpClient;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS_PAGE: &str = r#"
<html><body>
<div id="links" class="results">
  <div class="result results_links result--ad">
    <h2 class="result__title"><a class="result__a" href="https://ads.example/buy">Buy Rust now</a></h2>
    <a class="result__snippet" href="https://ads.example/buy">Sponsored</a>
  </div>
  <div class="result results_links results_links_deep web-result">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust Programming Language</a>
    </h2>
    <a class="result__snippet" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F">A language empowering everyone to build <b>reliable</b> and efficient software.</a>
  </div>
  <div class="result results_links results_links_deep web-result">
    <h2 class="result__title"><a class="result__a" href="https://doc.rust-lang.org/book/">The Rust Book</a></h2>
    <a class="result__snippet" href="https://doc.rust-lang.org/book/">An introductory book about Rust.</a>
  </div>
  <div class="result results_links results_links_deep web-result">
    <h2 class="result__title"><a class="result__a" href="https://crates.io/">crates.io</a></h2>
    <a class="result__snippet" href="https://crates.io/">The Rust community's crate registry.</a>
  </div>
</div>
</body></html>
"#;

    const EMPTY_PAGE: &str = r#"<html><body><div class="no-results">No results.</div></body></html>"#;

    #[test]
    fn test_parse_results_skips_ads_and_resolves_links() {
        let hits = parse_results(RESULTS_PAGE, 10);

        assert_eq!(hits.len(), 3);
        assert_eq!(
            hits[0],
            SearchHit {
                title: "Rust Programming Language".to_string(),
                snippet: "A language empowering everyone to build reliable and efficient software."
                    .to_string(),
                link: "https://www.rust-lang.org/".to_string(),
            }
        );
        assert_eq!(hits[1].link, "https://doc.rust-lang.org/book/");
    }

    #[test]
    fn test_parse_results_limit() {
        let hits = parse_results(RESULTS_PAGE, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].title, "The Rust Book");
    }

    #[tokio::test]
    async fn test_search_renders_top_results() {
        let client = MockHttpClient::new().with_text_response(DEFAULT_DUCKDUCKGO_URL, RESULTS_PAGE);

        let outcome = DuckDuckGoSearch::new(client)
            .with_max_results(2)
            .search("rust")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebSearchOutcome::Results(
                "snippet: A language empowering everyone to build reliable and efficient software., \
                 title: Rust Programming Language, link: https://www.rust-lang.org/\n\
                 snippet: An introductory book about Rust., title: The Rust Book, \
                 link: https://doc.rust-lang.org/book/"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_search_against_results_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "what is rust"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(RESULTS_PAGE, "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let outcome = DuckDuckGoSearch::new(HttpClient::new())
            .with_base_url(format!("{}/html/", server.uri()))
            .search("what is rust")
            .await
            .unwrap();

        match outcome {
            WebSearchOutcome::Results(text) => {
                assert_eq!(text.lines().count(), 3);
                assert!(text.contains("link: https://www.rust-lang.org/"));
                assert!(!text.contains("Sponsored"));
            }
            WebSearchOutcome::Failed(reason) => panic!("unexpected failure: {}", reason),
        }
    }

    #[tokio::test]
    async fn test_empty_page_is_soft_failure() {
        let client = MockHttpClient::new().with_text_response(DEFAULT_DUCKDUCKGO_URL, EMPTY_PAGE);

        let outcome = DuckDuckGoSearch::new(client).search("nothing").await.unwrap();
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let client = MockHttpClient::new().with_error("http://ddg.test/", "connection refused");

        let result = DuckDuckGoSearch::new(client)
            .with_base_url("http://ddg.test/")
            .search("x")
            .await;
        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }
}

//! Article download and HTML extraction.
//!
//! Pages are fetched either directly or through an AllOrigins-style proxy
//! (`GET {proxy}?url=<page>` answering `{"contents": "<html>"}`), then parsed
//! with `scraper`.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

use super::{ArticleFetcher, ArticleLink, FetchedArticle};
use crate::config::FetchConfig;
use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    contents: Option<String>,
}

/// Fetches news pages over HTTP and extracts their text and metadata.
#[derive(Debug, Clone)]
pub struct HtmlArticleFetcher {
    client: reqwest::Client,
    proxy_url: Option<String>,
}

impl HtmlArticleFetcher {
    pub fn new(config: &FetchConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ProviderError::invalid_response(format!("bad user agent: {e}")))?;
        headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            proxy_url: config.proxy_url.clone().filter(|p| !p.trim().is_empty()),
        })
    }

    async fn download(&self, page_url: &str) -> Result<String, ProviderError> {
        let request = match &self.proxy_url {
            Some(proxy) => self.client.get(proxy).query(&[("url", page_url)]),
            None => self.client.get(page_url),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        if self.proxy_url.is_some() {
            let wrapped: ProxyResponse = response.json().await?;
            wrapped
                .contents
                .ok_or_else(|| ProviderError::invalid_response("proxy response has no contents"))
        } else {
            Ok(response.text().await?)
        }
    }
}

#[async_trait]
impl ArticleFetcher for HtmlArticleFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedArticle, ProviderError> {
        let html = self.download(url).await?;
        let article = extract_article(&html, url);
        tracing::debug!(
            url = %url,
            text_length = article.text.len(),
            authors = article.authors.len(),
            "Extracted article"
        );
        Ok(article)
    }

    async fn list_links(&self, site_url: &str) -> Result<Vec<ArticleLink>, ProviderError> {
        let html = self.download(site_url).await?;
        Ok(extract_links(&html))
    }

    fn provider_name(&self) -> &'static str {
        if self.proxy_url.is_some() {
            "html (proxied)"
        } else {
            "html"
        }
    }
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static CSS selector is valid")
}

static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static META_AUTHOR: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[name="author"]"#));
static CANONICAL: LazyLock<Selector> = LazyLock::new(|| selector(r#"link[rel="canonical"]"#));
static OG_URL: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:url"]"#));
static OG_SITE_NAME: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="og:site_name"]"#));
static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"script[type="application/ld+json"]"#));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .find_map(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Pull text, authors, canonical URL and site name out of a page.
pub(crate) fn extract_article(html: &str, page_url: &str) -> FetchedArticle {
    let document = Html::parse_document(html);

    let text = document
        .select(&PARAGRAPH)
        .map(element_text)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut authors = extract_jsonld_authors(&document);
    if authors.is_empty()
        && let Some(author) = meta_content(&document, &META_AUTHOR)
    {
        authors.push(author);
    }

    let base = Url::parse(page_url).ok();
    let canonical = document
        .select(&CANONICAL)
        .find_map(|el| el.value().attr("href"))
        .map(ToString::to_string)
        .or_else(|| meta_content(&document, &OG_URL))
        .and_then(|href| match &base {
            Some(base) => base.join(&href).ok().map(String::from),
            None => Url::parse(&href).ok().map(String::from),
        });

    FetchedArticle {
        text,
        authors,
        source_url: canonical.or_else(|| Some(page_url.to_string())),
        site_name: meta_content(&document, &OG_SITE_NAME),
    }
}

/// Authors declared in JSON-LD metadata, de-duplicated in document order.
fn extract_jsonld_authors(document: &Html) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut authors = Vec::new();

    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        let Ok(json) = serde_json::from_str::<serde_json::Value>(raw.trim()) else {
            continue;
        };
        let mut names = Vec::new();
        collect_author_names(&json, &mut names);
        for name in names {
            if seen.insert(name.clone()) {
                authors.push(name);
            }
        }
    }

    authors
}

fn collect_author_names(node: &serde_json::Value, out: &mut Vec<String>) {
    use serde_json::Value;

    match node {
        Value::Array(items) => items.iter().for_each(|item| collect_author_names(item, out)),
        Value::Object(obj) => {
            if let Some(graph) = obj.get("@graph") {
                collect_author_names(graph, out);
            }
            match obj.get("author") {
                Some(Value::String(s)) => push_name(s, out),
                Some(Value::Object(a)) => {
                    if let Some(Value::String(s)) = a.get("name") {
                        push_name(s, out);
                    }
                }
                Some(Value::Array(list)) => {
                    for a in list {
                        match a {
                            Value::String(s) => push_name(s, out),
                            Value::Object(o) => {
                                if let Some(Value::String(s)) = o.get("name") {
                                    push_name(s, out);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        _ => {}
    }
}

fn push_name(name: &str, out: &mut Vec<String>) {
    let name = name.trim();
    if !name.is_empty() {
        out.push(name.to_string());
    }
}

/// Absolute `http(s)` links with non-empty anchor text, first occurrence wins.
pub(crate) fn extract_links(html: &str) -> Vec<ArticleLink> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&LINK)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if !href.starts_with("http") {
                return None;
            }
            let title = element_text(a);
            if title.is_empty() || !seen.insert(href.to_string()) {
                return None;
            }
            Some(ArticleLink {
                title,
                url: href.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
  <meta property="og:site_name" content="Dawn">
  <link rel="canonical" href="/news/1852663/olympic-win">
  <script type="application/ld+json">
    {"@context":"https://schema.org","@type":"NewsArticle",
     "author":[{"@type":"Person","name":"Jane Doe"},{"@type":"Person","name":" John Roe "}]}
  </script>
  <meta name="author" content="Ignored Meta">
</head><body>
  <article>
    <p>Arshad Nadeem   won gold.</p>
    <p></p>
    <p>The army chief lauded the <b>remarkable</b> achievement.</p>
  </article>
  <a href="https://www.dawn.com/news/1">First story</a>
  <a href="/relative">Relative story</a>
  <a href="https://www.dawn.com/news/1">Duplicate</a>
  <a href="https://www.dawn.com/news/2">  </a>
  <a href="https://www.dawn.com/news/3">Third
     story</a>
</body></html>"#;

    #[test]
    fn test_static_selectors_parse() {
        let document = Html::parse_document(PAGE);
        for sel in [
            &*PARAGRAPH,
            &*META_AUTHOR,
            &*CANONICAL,
            &*OG_URL,
            &*OG_SITE_NAME,
            &*JSON_LD,
            &*LINK,
        ] {
            let _ = document.select(sel).count();
        }
        assert_eq!(document.select(&PARAGRAPH).count(), 3);
        assert_eq!(
            meta_content(&document, &OG_SITE_NAME).as_deref(),
            Some("Dawn")
        );
    }

    #[test]
    fn test_extract_text_joins_paragraphs() {
        let article = extract_article(PAGE, "https://www.dawn.com/news/1852663");
        assert_eq!(
            article.text,
            "Arshad Nadeem won gold.\n\nThe army chief lauded the remarkable achievement."
        );
    }

    #[test]
    fn test_extract_metadata() {
        let article = extract_article(PAGE, "https://www.dawn.com/news/1852663?utm=x");
        assert_eq!(article.authors, vec!["Jane Doe", "John Roe"]);
        assert_eq!(
            article.source_url.as_deref(),
            Some("https://www.dawn.com/news/1852663/olympic-win")
        );
        assert_eq!(article.site_name.as_deref(), Some("Dawn"));
    }

    #[test]
    fn test_meta_author_fallback_and_default_url() {
        let html = r#"<html><head><meta name="author" content="Staff Reporter"></head>
            <body><p>Body</p></body></html>"#;
        let article = extract_article(html, "https://example.com/a");
        assert_eq!(article.authors, vec!["Staff Reporter"]);
        assert_eq!(article.source_url.as_deref(), Some("https://example.com/a"));
        assert!(article.site_name.is_none());
    }

    #[test]
    fn test_jsonld_graph_and_string_author() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@graph":[{"@type":"WebPage"},{"@type":"NewsArticle","author":"Wire Desk"}]}
            </script></head><body></body></html>"#;
        let article = extract_article(html, "https://example.com/a");
        assert_eq!(article.authors, vec!["Wire Desk"]);
        assert!(article.text.is_empty());
    }

    #[test]
    fn test_extract_links() {
        let links = extract_links(PAGE);
        let titles: Vec<_> = links.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, ["First story", "Third story"]);
        assert_eq!(links[1].url, "https://www.dawn.com/news/3");
    }
}

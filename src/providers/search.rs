//! Title search against a NewsAPI-compatible `/v2/everything` endpoint.

use async_trait::async_trait;
use serde::Deserialize;

use super::ArticleSearch;
use crate::config::SearchConfig;
use crate::error::{ProviderError, ProviderErrorKind};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    url: Option<String>,
}

#[derive(Clone)]
pub struct NewsApiSearch {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
}

impl std::fmt::Debug for NewsApiSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsApiSearch")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl NewsApiSearch {
    #[must_use]
    pub fn new(config: &SearchConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            language: config.language.clone(),
        }
    }
}

#[async_trait]
impl ArticleSearch for NewsApiSearch {
    async fn first_match(&self, title: &str) -> Result<Option<String>, ProviderError> {
        let Some(api_key) = &self.api_key else {
            return Err(ProviderError::new(
                ProviderErrorKind::Unknown,
                "search API key is not configured",
            ));
        };

        let url = format!("{}/v2/everything", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("q", title),
                ("apiKey", api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        let body: SearchResponse = resp.json().await?;
        if body.status.as_deref() == Some("error") {
            return Err(ProviderError::invalid_response(
                body.message.unwrap_or_else(|| "search failed".to_string()),
            ));
        }

        let hit = body.articles.into_iter().find_map(|a| a.url);
        tracing::debug!(title = %title, found = hit.is_some(), "Title search finished");
        Ok(hit)
    }

    fn provider_name(&self) -> &'static str {
        "newsapi"
    }
}

//! External service seams.
//!
//! Each capability the pipeline needs is a trait so that HTTP adapters can be
//! swapped for in-process fakes. [`Providers`] bundles one implementation of
//! each and is built from configuration by [`Providers::from_config`].

pub mod chat;
pub mod fetch;
pub mod search;
pub mod speech;

pub use chat::{ChatAnswerer, ChatSummarizer, ChatTranslator};
pub use fetch::HtmlArticleFetcher;
pub use search::NewsApiSearch;
pub use speech::SpeechApiSynthesizer;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::ProviderError;
use crate::language::Language;
use crate::llm::ChatClient;

/// What an [`ArticleFetcher`] extracts from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedArticle {
    pub text: String,
    pub authors: Vec<String>,
    /// Canonical URL when the page declares one, else the requested URL.
    pub source_url: Option<String>,
    pub site_name: Option<String>,
}

/// A link found on a newspaper front page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleLink {
    pub title: String,
    pub url: String,
}

/// Length limits handed to a [`Summarizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryBudget {
    pub max_words: u32,
    /// Generation cap, derived from `max_words`.
    pub max_tokens: u32,
}

impl SummaryBudget {
    /// Roughly four tokens per word.
    #[must_use]
    pub fn for_words(max_words: u32) -> Self {
        Self {
            max_words,
            max_tokens: max_words.saturating_mul(4),
        }
    }
}

#[async_trait]
pub trait ArticleFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, url: &str) -> Result<FetchedArticle, ProviderError>;

    /// Links to articles published on a site's front page.
    async fn list_links(&self, site_url: &str) -> Result<Vec<ArticleLink>, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

#[async_trait]
pub trait ArticleSearch: Send + Sync + std::fmt::Debug {
    /// URL of the best match for `title`, `None` when nothing matched.
    async fn first_match(&self, title: &str) -> Result<Option<String>, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

#[async_trait]
pub trait Translator: Send + Sync + std::fmt::Debug {
    async fn translate(
        &self,
        text: &str,
        target: Language,
        source: Language,
    ) -> Result<String, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

#[async_trait]
pub trait Summarizer: Send + Sync + std::fmt::Debug {
    async fn summarize(&self, text: &str, budget: SummaryBudget) -> Result<String, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

#[async_trait]
pub trait QuestionAnswerer: Send + Sync + std::fmt::Debug {
    async fn answer(&self, text: &str, question: &str) -> Result<String, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + std::fmt::Debug {
    /// Encoded audio (MP3) for `text` spoken in `language`.
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

/// One implementation of every provider seam.
#[derive(Debug, Clone)]
pub struct Providers {
    pub fetcher: Arc<dyn ArticleFetcher>,
    pub search: Arc<dyn ArticleSearch>,
    pub translator: Arc<dyn Translator>,
    pub summarizer: Arc<dyn Summarizer>,
    pub answerer: Arc<dyn QuestionAnswerer>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}

impl Providers {
    /// Build the HTTP adapters described by `config.providers`.
    ///
    /// The three LLM-backed roles share one [`ChatClient`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let timeout = config.resilience.provider_timeout();
        let providers = &config.providers;

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let chat = ChatClient::new(providers.llm.settings(), http.clone());

        let built = Self {
            fetcher: Arc::new(HtmlArticleFetcher::new(&providers.fetch, timeout)?),
            search: Arc::new(NewsApiSearch::new(&providers.search, http.clone())),
            translator: Arc::new(ChatTranslator::new(chat.clone())),
            summarizer: Arc::new(ChatSummarizer::new(chat.clone())),
            answerer: Arc::new(ChatAnswerer::new(chat)),
            speech: Arc::new(SpeechApiSynthesizer::new(&providers.speech, http)),
        };

        tracing::info!(
            fetcher = built.fetcher.provider_name(),
            search = built.search.provider_name(),
            llm_model = %providers.llm.model,
            speech = built.speech.provider_name(),
            "Providers configured"
        );

        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_scales_tokens() {
        let budget = SummaryBudget::for_words(200);
        assert_eq!(budget.max_tokens, 800);
        assert_eq!(SummaryBudget::for_words(u32::MAX).max_tokens, u32::MAX);
    }
}

//! In-process providers and state for the HTTP tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use newsdesk::AppState;
use newsdesk::config::AppConfig;
use newsdesk::error::{ProviderError, ProviderErrorKind};
use newsdesk::language::Language;
use newsdesk::providers::{
    ArticleFetcher, ArticleLink, ArticleSearch, FetchedArticle, Providers, QuestionAnswerer,
    SpeechSynthesizer, Summarizer, SummaryBudget, Translator,
};

pub const ARTICLE_TEXT: &str = "Arshad Nadeem won the javelin gold in Paris with an Olympic record.";

/// Canned answers for every provider, with a record of what was asked.
#[derive(Debug, Default)]
pub struct Desk {
    pub summaries: Mutex<Vec<SummaryBudget>>,
    pub spoken: Mutex<Vec<Language>>,
    pub search_empty: bool,
    pub rate_limited_summary: bool,
    pub fetch_delay: Option<Duration>,
}

#[async_trait]
impl ArticleFetcher for Desk {
    async fn fetch(&self, url: &str) -> Result<FetchedArticle, ProviderError> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if url.contains("unreachable") {
            return Err(ProviderError::unreachable("connection refused"));
        }
        Ok(FetchedArticle {
            text: ARTICLE_TEXT.to_string(),
            authors: vec!["Dawn Report".to_string()],
            source_url: Some(url.to_string()),
            site_name: Some("Dawn".to_string()),
        })
    }

    async fn list_links(&self, _site_url: &str) -> Result<Vec<ArticleLink>, ProviderError> {
        Ok(vec![
            ArticleLink {
                title: "Gold in Paris".to_string(),
                url: "https://www.dawn.com/news/1".to_string(),
            },
            ArticleLink {
                title: "Budget passed".to_string(),
                url: "https://www.dawn.com/news/2".to_string(),
            },
        ])
    }

    fn provider_name(&self) -> &'static str {
        "desk"
    }
}

#[async_trait]
impl ArticleSearch for Desk {
    async fn first_match(&self, _title: &str) -> Result<Option<String>, ProviderError> {
        if self.search_empty {
            Ok(None)
        } else {
            Ok(Some("https://www.dawn.com/news/1852663".to_string()))
        }
    }

    fn provider_name(&self) -> &'static str {
        "desk"
    }
}

#[async_trait]
impl Translator for Desk {
    async fn translate(
        &self,
        text: &str,
        target: Language,
        _source: Language,
    ) -> Result<String, ProviderError> {
        Ok(format!("({}) {text}", target.code()))
    }

    fn provider_name(&self) -> &'static str {
        "desk"
    }
}

#[async_trait]
impl Summarizer for Desk {
    async fn summarize(&self, _text: &str, budget: SummaryBudget) -> Result<String, ProviderError> {
        if self.rate_limited_summary {
            return Err(ProviderError::new(ProviderErrorKind::RateLimited, "slow down"));
        }
        self.summaries.lock().unwrap().push(budget);
        Ok("Nadeem wins gold.".to_string())
    }

    fn provider_name(&self) -> &'static str {
        "desk"
    }
}

#[async_trait]
impl QuestionAnswerer for Desk {
    async fn answer(&self, _text: &str, question: &str) -> Result<String, ProviderError> {
        Ok(format!("You asked: {question}"))
    }

    fn provider_name(&self) -> &'static str {
        "desk"
    }
}

#[async_trait]
impl SpeechSynthesizer for Desk {
    async fn synthesize(&self, _text: &str, language: Language) -> Result<Vec<u8>, ProviderError> {
        self.spoken.lock().unwrap().push(language);
        Ok(b"ID3\x04fake-mp3".to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "desk"
    }
}

pub fn providers(desk: &Arc<Desk>) -> Providers {
    Providers {
        fetcher: Arc::clone(desk) as Arc<dyn ArticleFetcher>,
        search: Arc::clone(desk) as Arc<dyn ArticleSearch>,
        translator: Arc::clone(desk) as Arc<dyn Translator>,
        summarizer: Arc::clone(desk) as Arc<dyn Summarizer>,
        answerer: Arc::clone(desk) as Arc<dyn QuestionAnswerer>,
        speech: Arc::clone(desk) as Arc<dyn SpeechSynthesizer>,
    }
}

/// Defaults with rate limiting off; `args` are extra CLI flags.
pub fn config(args: &[&str]) -> AppConfig {
    let argv = ["newsdesk", "--rate-limit-enabled", "false"]
        .into_iter()
        .chain(args.iter().copied());
    AppConfig::load_from_args(argv).expect("default config loads")
}

pub fn state(desk: &Arc<Desk>, config: AppConfig) -> AppState {
    AppState::new(Arc::new(config), providers(desk))
}

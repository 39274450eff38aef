//! The article pipeline: provider calls plus the session updates they lead to.
//!
//! Every operation takes the [`Session`] it works on. Provider calls are made
//! once each and bounded by [`PipelineOptions::call_timeout`]; a failed call
//! leaves the session as it was.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use url::Url;

use crate::config::{AppConfig, AudioLanguage, SummaryLength};
use crate::error::{PipelineError, ProviderError};
use crate::language::Language;
use crate::providers::{ArticleLink, Providers, SummaryBudget};
use crate::session::{Answer, Article, Session, Summary};

const NO_ARTICLE: &str = "No article found. Please fetch an article first.";
const NO_SUMMARY: &str = "No summary found. Please summarize the article first.";

/// Where an article comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleSource {
    Url(String),
    Title(String),
}

impl ArticleSource {
    /// Pick a source from optional request fields. A URL wins over a title;
    /// blank strings count as absent.
    pub fn from_parts(url: Option<String>, title: Option<String>) -> Result<Self, PipelineError> {
        let url = url.filter(|u| !u.trim().is_empty());
        let title = title.filter(|t| !t.trim().is_empty());
        match (url, title) {
            (Some(url), _) => Ok(Self::Url(url.trim().to_string())),
            (None, Some(title)) => Ok(Self::Title(title.trim().to_string())),
            (None, None) => Err(PipelineError::Validation(
                "Either url or title must be provided".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub call_timeout: Duration,
    pub summary_length: SummaryLength,
    pub audio_language: AudioLanguage,
    pub audio_fixed_language: Language,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            summary_length: SummaryLength::Advisory,
            audio_language: AudioLanguage::FollowContent,
            audio_fixed_language: Language::En,
        }
    }
}

impl PipelineOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            call_timeout: config.resilience.provider_timeout(),
            summary_length: config.pipeline.summary_length,
            audio_language: config.pipeline.audio_language,
            audio_fixed_language: config.pipeline.audio_fixed_language,
        }
    }
}

/// Keep the first `max_words` words of `text`, joined by single spaces, and
/// append `...`. Text within the budget is returned unchanged.
#[must_use]
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    format!("{}...", words[..max_words].join(" "))
}

fn parse_http_url(raw: &str) -> Result<Url, PipelineError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| PipelineError::Validation(format!("Invalid URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PipelineError::Validation(format!(
            "Unsupported URL scheme {other:?}"
        ))),
    }
}

fn ensure_target(language: Language) -> Result<(), PipelineError> {
    if language.is_valid_target() {
        Ok(())
    } else {
        Err(PipelineError::Validation(format!(
            "{} is not a valid target language",
            language.code()
        )))
    }
}

#[derive(Debug, Clone)]
pub struct ArticlePipeline {
    providers: Providers,
    options: PipelineOptions,
}

impl ArticlePipeline {
    #[must_use]
    pub fn new(providers: Providers, options: PipelineOptions) -> Self {
        Self { providers, options }
    }

    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run one provider call under the per-call timeout.
    async fn call<T, F>(&self, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match tokio::time::timeout(self.options.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::unreachable(format!(
                "no response within {}s",
                self.options.call_timeout.as_secs()
            ))),
        }
    }

    /// Turn a title into a URL through the search provider.
    pub async fn resolve_url(&self, source: ArticleSource) -> Result<String, PipelineError> {
        match source {
            ArticleSource::Url(raw) => Ok(parse_http_url(&raw)?.to_string()),
            ArticleSource::Title(title) => {
                let found = self
                    .call(self.providers.search.first_match(&title))
                    .await
                    .map_err(PipelineError::Search)?;
                let url = found.ok_or_else(|| PipelineError::NoSearchResults(title.clone()))?;
                tracing::info!(title = %title, url = %url, "Resolved article title");
                Ok(url)
            }
        }
    }

    async fn translate(
        &self,
        text: &str,
        target: Language,
        source: Language,
    ) -> Result<String, PipelineError> {
        self.call(self.providers.translator.translate(text, target, source))
            .await
            .map_err(PipelineError::Translation)
    }

    /// Fetch an article, translate it unless `target` is English, and make it
    /// the session's current article.
    pub async fn fetch(
        &self,
        session: &Session,
        source: ArticleSource,
        target: Language,
        source_hint: Language,
    ) -> Result<Article, PipelineError> {
        ensure_target(target)?;
        let url = self.resolve_url(source).await?;

        let fetched = self
            .call(self.providers.fetcher.fetch(&url))
            .await
            .map_err(PipelineError::Fetch)?;

        let (text, original_text, language) =
            if target.is_english() || fetched.text.trim().is_empty() {
                let language = if target.is_english() || source_hint == Language::Auto {
                    Language::En
                } else {
                    source_hint
                };
                (fetched.text, None, language)
            } else {
                let translated = self.translate(&fetched.text, target, source_hint).await?;
                (translated, Some(fetched.text), target)
            };

        let article = Article {
            text,
            authors: fetched.authors,
            source_url: fetched.source_url.or(Some(url)),
            site_name: fetched.site_name,
            original_text,
            language,
            fetched_at: Utc::now(),
        };
        session.put_article(article.clone());

        tracing::info!(
            session_id = %session.id(),
            source_url = ?article.source_url,
            language = %article.language,
            translated = article.original_text.is_some(),
            text_length = article.text.len(),
            "Article stored"
        );
        Ok(article)
    }

    /// Summarize the current article and store the result.
    pub async fn summarize(
        &self,
        session: &Session,
        max_words: u32,
        target: Language,
    ) -> Result<Summary, PipelineError> {
        if max_words == 0 {
            return Err(PipelineError::Validation(
                "max_words must be greater than zero".to_string(),
            ));
        }
        ensure_target(target)?;
        let article = session
            .article()
            .ok_or_else(|| PipelineError::NotFound(NO_ARTICLE.to_string()))?;

        let mut text = self
            .call(
                self.providers
                    .summarizer
                    .summarize(&article.text, SummaryBudget::for_words(max_words)),
            )
            .await
            .map_err(PipelineError::Summarization)?;

        if self.options.summary_length == SummaryLength::Truncate {
            text = truncate_words(&text, max_words as usize);
        }
        if !target.is_english() {
            text = self.translate(&text, target, Language::En).await?;
        }

        let summary = Summary {
            text,
            max_words,
            language: target,
            created_at: Utc::now(),
        };
        session.put_summary(summary.clone());

        tracing::info!(
            session_id = %session.id(),
            max_words,
            language = %target,
            "Summary stored"
        );
        Ok(summary)
    }

    /// Answer a question about the current article and log it.
    pub async fn answer(
        &self,
        session: &Session,
        question: &str,
        target: Language,
    ) -> Result<Answer, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::Validation(
                "Question must not be empty".to_string(),
            ));
        }
        ensure_target(target)?;
        let article = session
            .article()
            .ok_or_else(|| PipelineError::NotFound(NO_ARTICLE.to_string()))?;

        let mut text = self
            .call(self.providers.answerer.answer(&article.text, question))
            .await
            .map_err(PipelineError::Answer)?;
        if !target.is_english() {
            text = self.translate(&text, target, Language::En).await?;
        }

        let answer = Answer {
            question: question.to_string(),
            text,
            language: target,
            asked_at: Utc::now(),
        };
        session.append_answer(answer.clone());

        tracing::debug!(session_id = %session.id(), language = %target, "Answer logged");
        Ok(answer)
    }

    fn audio_language(&self, content: Language) -> Language {
        match self.options.audio_language {
            AudioLanguage::FollowContent => content,
            AudioLanguage::Fixed => self.options.audio_fixed_language,
        }
    }

    async fn speak(&self, text: &str, content: Language) -> Result<Vec<u8>, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::Validation(
                "There is no text to synthesize".to_string(),
            ));
        }
        let language = self.audio_language(content);
        self.call(self.providers.speech.synthesize(text, language))
            .await
            .map_err(PipelineError::Audio)
    }

    /// MP3 rendering of the current article.
    pub async fn article_audio(&self, session: &Session) -> Result<Vec<u8>, PipelineError> {
        let article = session
            .article()
            .ok_or_else(|| PipelineError::NotFound(NO_ARTICLE.to_string()))?;
        self.speak(&article.text, article.language).await
    }

    /// MP3 rendering of the current summary.
    pub async fn summary_audio(&self, session: &Session) -> Result<Vec<u8>, PipelineError> {
        let summary = session
            .summary()
            .ok_or_else(|| PipelineError::NotFound(NO_SUMMARY.to_string()))?;
        self.speak(&summary.text, summary.language).await
    }

    /// Up to `limit` article links from a site's front page.
    pub async fn list_site_articles(
        &self,
        site_url: &str,
        limit: usize,
    ) -> Result<Vec<ArticleLink>, PipelineError> {
        if limit == 0 {
            return Err(PipelineError::Validation(
                "limit must be greater than zero".to_string(),
            ));
        }
        let url = parse_http_url(site_url)?;
        let mut links = self
            .call(self.providers.fetcher.list_links(url.as_str()))
            .await
            .map_err(PipelineError::Fetch)?;
        links.truncate(limit);
        Ok(links)
    }
}

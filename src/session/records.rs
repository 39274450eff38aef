//! Values held by a session: the current article, its summary and the answer log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// A fetched article as stored in a session.
///
/// `text` is what every later operation consumes. When the article was
/// translated on fetch, the untranslated text is kept in `original_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub text: String,
    pub authors: Vec<String>,
    pub source_url: Option<String>,
    /// Newspaper name from `og:site_name`, when the page declares one.
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    /// Language `text` is in.
    pub language: Language,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    /// Word budget the summary was requested with.
    pub max_words: u32,
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

/// One entry of the question/answer log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub language: Language,
    pub asked_at: DateTime<Utc>,
}

//! Translation, summarization and question answering on top of one chat model.

use async_trait::async_trait;

use super::{QuestionAnswerer, Summarizer, SummaryBudget, Translator};
use crate::error::ProviderError;
use crate::language::Language;
use crate::llm::{ChatClient, CompletionOptions, Message};

const SUMMARY_PROMPT: &str = "Summarize the following article in a concise manner:";
const ANSWER_PROMPT: &str = "You are an AI assistant who knows everything.";
const TRANSLATION_MAX_TOKENS: u32 = 1024;

pub(crate) fn translation_prompt(target: Language, source: Language) -> String {
    let mut prompt = format!(
        "Translate the following text to {}. Reply with the translation only.",
        target.name()
    );
    if source != Language::Auto {
        prompt.push_str(&format!(" The text is written in {}.", source.name()));
    }
    prompt
}

pub(crate) fn summary_messages(text: &str, budget: SummaryBudget) -> Vec<Message> {
    vec![
        Message::system(format!(
            "{SUMMARY_PROMPT} Use at most {} words.",
            budget.max_words
        )),
        Message::user(text),
    ]
}

pub(crate) fn answer_messages(text: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(ANSWER_PROMPT),
        Message::user(text),
        Message::user(format!("Question: {question}")),
    ]
}

#[derive(Debug, Clone)]
pub struct ChatTranslator {
    chat: ChatClient,
}

impl ChatTranslator {
    #[must_use]
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate(
        &self,
        text: &str,
        target: Language,
        source: Language,
    ) -> Result<String, ProviderError> {
        let messages = vec![
            Message::system(translation_prompt(target, source)),
            Message::user(text),
        ];
        let options = CompletionOptions {
            max_tokens: TRANSLATION_MAX_TOKENS,
            ..CompletionOptions::default()
        };
        self.chat.complete(messages, options).await
    }

    fn provider_name(&self) -> &'static str {
        "chat"
    }
}

#[derive(Debug, Clone)]
pub struct ChatSummarizer {
    chat: ChatClient,
}

impl ChatSummarizer {
    #[must_use]
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, text: &str, budget: SummaryBudget) -> Result<String, ProviderError> {
        let options = CompletionOptions {
            max_tokens: budget.max_tokens,
            ..CompletionOptions::default()
        };
        self.chat.complete(summary_messages(text, budget), options).await
    }

    fn provider_name(&self) -> &'static str {
        "chat"
    }
}

#[derive(Debug, Clone)]
pub struct ChatAnswerer {
    chat: ChatClient,
}

impl ChatAnswerer {
    #[must_use]
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl QuestionAnswerer for ChatAnswerer {
    async fn answer(&self, text: &str, question: &str) -> Result<String, ProviderError> {
        self.chat
            .complete(answer_messages(text, question), CompletionOptions::default())
            .await
    }

    fn provider_name(&self) -> &'static str {
        "chat"
    }
}

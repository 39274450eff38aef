//! Chat-completion plumbing shared by the summarizer, answerer and translator.
//!
//! # Overview
//!
//! The [`LlmDriver`] trait is the streaming seam: a driver turns an
//! [`LlmRequest`] into a stream of text deltas. [`ChatClient`] sits on top and
//! collects a whole completion, which is all the article pipeline needs.
//!
//! # Drivers
//!
//! - [`ChatCompletionsDriver`]: OpenAI-compatible Chat Completions API
//!   (`/v1/chat/completions`), including Azure deployments.
//!
//! # Example
//!
//! ```rust,ignore
//! use newsdesk::llm::{ChatClient, CompletionOptions, LlmSettings, Message};
//!
//! let client = ChatClient::new(settings, reqwest::Client::new());
//! let text = client
//!     .complete(vec![Message::user("Hello")], CompletionOptions::default())
//!     .await?;
//! ```

pub mod chat_completions;
pub mod client;
pub mod provider;

pub use chat_completions::ChatCompletionsDriver;
pub use client::ChatClient;
pub use provider::Provider;

use std::pin::Pin;

use futures::Stream;

use crate::error::ProviderError;

/// LLM connection and model settings.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.aimlapi.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `meta-llama/Meta-Llama-3-8B-Instruct-Turbo`).
    pub model: String,
    /// Provider type (auto-detected from `base_url` if not specified).
    pub provider: Provider,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider", &self.provider)
            .finish()
    }
}

impl LlmSettings {
    /// Build settings, detecting the provider from the base URL.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into();
        Self {
            provider: Provider::detect_from_url(&base_url),
            base_url,
            api_key,
            model: model.into(),
        }
    }
}

/// A message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Sampling knobs forwarded with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

/// Request to an LLM driver.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub options: CompletionOptions,
}

/// Stream of assistant text deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Trait for LLM streaming drivers.
#[async_trait::async_trait]
pub trait LlmDriver: Send + Sync {
    /// Stream a response from the LLM.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the provider rejects
    /// it before streaming starts. Failures mid-stream arrive as stream items.
    async fn stream(&self, req: LlmRequest) -> Result<DeltaStream, ProviderError>;
}

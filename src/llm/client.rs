//! Non-streaming facade over an [`LlmDriver`].

use std::sync::Arc;

use futures::StreamExt;
use uuid::Uuid;

use crate::error::ProviderError;

use super::{ChatCompletionsDriver, CompletionOptions, LlmDriver, LlmRequest, LlmSettings, Message};

/// Collects streamed completions into whole strings.
#[derive(Clone)]
pub struct ChatClient {
    driver: Arc<dyn LlmDriver>,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("driver", &"<dyn LlmDriver>")
            .finish()
    }
}

impl ChatClient {
    /// Client backed by the Chat Completions driver.
    #[must_use]
    pub fn new(settings: LlmSettings, http: reqwest::Client) -> Self {
        Self::with_driver(Arc::new(ChatCompletionsDriver::new(settings, http)))
    }

    #[must_use]
    pub fn with_driver(driver: Arc<dyn LlmDriver>) -> Self {
        Self { driver }
    }

    /// Run one completion and return the assistant text, trimmed.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<String, ProviderError> {
        let request_id = Uuid::new_v4().to_string();

        tracing::debug!(
            request_id = %request_id,
            message_count = messages.len(),
            max_tokens = options.max_tokens,
            "Starting chat completion"
        );

        let mut stream = self.driver.stream(LlmRequest { messages, options }).await?;
        let mut content = String::new();

        while let Some(delta) = stream.next().await {
            match delta {
                Ok(text) => content.push_str(&text),
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Error in completion stream");
                    return Err(e);
                }
            }
        }

        let content = content.trim().to_string();

        tracing::debug!(
            request_id = %request_id,
            content_length = content.len(),
            "Chat completion finished"
        );

        Ok(content)
    }
}

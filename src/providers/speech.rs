//! Text-to-speech over an OpenAI-compatible `/v1/audio/speech` endpoint.

use async_trait::async_trait;
use serde::Serialize;

use super::SpeechSynthesizer;
use crate::config::SpeechConfig;
use crate::error::ProviderError;
use crate::language::Language;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    language: &'a str,
}

#[derive(Clone)]
pub struct SpeechApiSynthesizer {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    voice: String,
}

impl std::fmt::Debug for SpeechApiSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechApiSynthesizer")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .finish_non_exhaustive()
    }
}

impl SpeechApiSynthesizer {
    #[must_use]
    pub fn new(config: &SpeechConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
            voice: config.voice.clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechApiSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/v1/audio/speech", self.base_url);
        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
            language: language.code(),
        };

        let mut rb = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }

        let resp = rb.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        let audio = resp.bytes().await?;
        if audio.is_empty() {
            return Err(ProviderError::invalid_response("speech provider returned no audio"));
        }

        tracing::debug!(language = %language, bytes = audio.len(), "Synthesized audio");
        Ok(audio.to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "speech-api"
    }
}

//! OpenAI Chat Completions API driver.
//!
//! This module implements the [`LlmDriver`] trait for the Chat Completions API
//! (`/v1/chat/completions`), requesting a streamed response and yielding the
//! assistant's text deltas.

use futures::StreamExt;

use crate::error::{ProviderError, ProviderErrorKind};

use super::{DeltaStream, LlmDriver, LlmRequest, LlmSettings, Provider};

/// Driver for the Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsDriver {
    /// Create a new Chat Completions driver with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings, http: reqwest::Client) -> Self {
        Self { http, settings }
    }

    fn request_body(&self, req: &LlmRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.settings.model,
            "stream": true,
            "messages": req.messages,
            "temperature": req.options.temperature,
            "max_tokens": req.options.max_tokens,
        })
    }
}

#[async_trait::async_trait]
impl LlmDriver for ChatCompletionsDriver {
    async fn stream(&self, req: LlmRequest) -> Result<DeltaStream, ProviderError> {
        let url = self
            .settings
            .provider
            .build_chat_url(&self.settings.base_url, &self.settings.model);

        let mut rb = self.http.post(&url).json(&self.request_body(&req));
        if let Some(k) = &self.settings.api_key {
            rb = match self.settings.provider {
                Provider::AzureOpenAI { .. } => rb.header("api-key", k),
                _ => rb.bearer_auth(k),
            };
        }

        let resp = rb.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        if !is_event_stream(resp.headers()) {
            // Servers that ignore `stream: true` answer with one JSON body.
            let body = resp.text().await?;
            let text = parse_message(&body)?;
            return Ok(Box::pin(futures::stream::iter([Ok::<_, ProviderError>(text)])));
        }
        let byte_stream = resp.bytes_stream();

        let out = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();
            let mut saw_data = false;

            futures::pin_mut!(byte_stream);
            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk?;
                buf.extend_from_slice(&chunk);

                for data in drain_sse_data(&mut buf) {
                    saw_data = true;
                    if data == "[DONE]" {
                        return;
                    }
                    if let Some(text) = parse_delta(&data)? {
                        yield text;
                    }
                }
            }

            // Some servers close without a trailing blank line.
            if !buf.is_empty() {
                let tail = String::from_utf8_lossy(&buf).into_owned();
                buf.extend_from_slice(b"\n\n");
                let frames = drain_sse_data(&mut buf);
                if frames.is_empty() && has_payload(&tail) {
                    Err::<(), _>(unframed_body(&tail))?;
                }
                for data in frames {
                    saw_data = true;
                    if data == "[DONE]" {
                        return;
                    }
                    if let Some(text) = parse_delta(&data)? {
                        yield text;
                    }
                }
            }

            if !saw_data {
                Err::<(), _>(ProviderError::invalid_response(
                    "event stream closed without any data frame",
                ))?;
            }
        };

        Ok(Box::pin(out))
    }
}

fn is_event_stream(headers: &reqwest::header::HeaderMap) -> bool {
    headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("text/event-stream"))
}

/// Whether leftover stream bytes hold anything besides SSE comments and fields.
fn has_payload(tail: &str) -> bool {
    tail.lines().map(str::trim).any(|line| {
        !line.is_empty()
            && !line.starts_with(':')
            && !["event:", "id:", "retry:"]
                .iter()
                .any(|field| line.starts_with(field))
    })
}

/// Error for a stream body that never used `data:` framing.
fn unframed_body(tail: &str) -> ProviderError {
    let parsed = serde_json::from_str::<serde_json::Value>(tail.trim()).ok();
    if let Some(err) = parsed.as_ref().and_then(error_payload) {
        return err;
    }
    let preview = tail.trim().chars().take(200).collect::<String>();
    ProviderError::invalid_response(format!("unframed event stream body: {preview}"))
}

/// Remove every complete SSE frame from `buf` and return their `data:` payloads.
pub(crate) fn drain_sse_data(buf: &mut Vec<u8>) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(pos) = find_double_newline(buf) {
        let frame = buf.drain(..pos + 2).collect::<Vec<_>>();
        let text = String::from_utf8_lossy(&frame);
        for line in text.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                out.push(data.trim().to_string());
            }
        }
    }
    out
}

/// Extract the assistant text from one streamed chunk.
///
/// A chunk carrying `message.content` instead of `delta.content` is read the
/// same way.
pub(crate) fn parse_delta(data: &str) -> Result<Option<String>, ProviderError> {
    let v: serde_json::Value = serde_json::from_str(data)?;
    if let Some(err) = error_payload(&v) {
        return Err(err);
    }

    let choice = &v["choices"][0];
    let text = choice["delta"]["content"]
        .as_str()
        .or_else(|| choice["message"]["content"].as_str());
    Ok(text.filter(|s| !s.is_empty()).map(ToString::to_string))
}

/// Extract the assistant text from a complete, non-streamed response body.
pub(crate) fn parse_message(body: &str) -> Result<String, ProviderError> {
    let v: serde_json::Value = serde_json::from_str(body.trim())?;
    if let Some(err) = error_payload(&v) {
        return Err(err);
    }

    v["choices"][0]["message"]["content"]
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| ProviderError::invalid_response("completion has no message content"))
}

/// Map an `{"error": {...}}` object onto a [`ProviderError`].
fn error_payload(v: &serde_json::Value) -> Option<ProviderError> {
    let err = v.get("error")?;
    let message = err
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("unknown error")
        .to_string();
    let kind = match err.get("code").and_then(|c| c.as_str()) {
        Some("rate_limit_exceeded") => ProviderErrorKind::RateLimited,
        _ => ProviderErrorKind::Unknown,
    };
    Some(ProviderError::new(kind, message))
}

/// Find the position of a double newline in the buffer.
fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_keeps_partial_frame() {
        let mut buf = b"data: {\"a\":1}\n\ndata: partial".to_vec();
        let frames = drain_sse_data(&mut buf);
        assert_eq!(frames, vec!["{\"a\":1}".to_string()]);
        assert_eq!(buf, b"data: partial");
    }

    #[test]
    fn test_drain_ignores_comments() {
        let mut buf = b": keep-alive\n\ndata: [DONE]\n\n".to_vec();
        assert_eq!(drain_sse_data(&mut buf), vec!["[DONE]".to_string()]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_parse_delta_content() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(parse_delta(data).unwrap(), Some("Hello".to_string()));
    }

    #[test]
    fn test_parse_delta_role_only() {
        let data = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_delta(data).unwrap(), None);
    }

    #[test]
    fn test_parse_non_streaming_body() {
        let data = r#"{"choices":[{"message":{"role":"assistant","content":"Whole"}}]}"#;
        assert_eq!(parse_delta(data).unwrap(), Some("Whole".to_string()));
    }

    #[test]
    fn test_parse_error_payload() {
        let data = r#"{"error":{"message":"too many","code":"rate_limit_exceeded"}}"#;
        let err = parse_delta(data).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
        assert_eq!(err.message, "too many");
    }

    #[test]
    fn test_parse_message_body() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Whole"}}]}"#;
        assert_eq!(parse_message(body).unwrap(), "Whole");

        let empty = r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#;
        assert_eq!(parse_message(empty).unwrap(), "");
    }

    #[test]
    fn test_parse_message_without_content() {
        let err = parse_message(r#"{"choices":[]}"#).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);

        let err = parse_message(r#"{"error":{"message":"quota","code":"rate_limit_exceeded"}}"#)
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
    }

    #[test]
    fn test_stream_tail_payload() {
        assert!(!has_payload(": keep-alive\n"));
        assert!(!has_payload("event: ping\nid: 4\n"));
        assert!(has_payload("{\"choices\":[]}"));

        let err = unframed_body(r#"{"error":{"message":"boom"}}"#);
        assert_eq!(err.kind, ProviderErrorKind::Unknown);
        assert_eq!(err.message, "boom");
        let err = unframed_body("<html>gateway</html>");
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);
    }

    #[test]
    fn test_parse_garbage_is_invalid_response() {
        let err = parse_delta("not json").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);
    }
}

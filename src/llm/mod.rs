//! Reqwest-based LLM client implementing OpenAI-compatible Chat Completions streaming.

use std::{pin::Pin, time::Duration};

use async_stream::try_stream;
use futures_core::Stream;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::AgentError;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: Option<u32>,
}

#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn from_config(cfg: &Config) -> Result<Self, AgentError> {
        let timeout = cfg.get_u64("REQUEST_TIMEOUT").unwrap_or(60);
        let api_base_url = cfg.get("API_BASE_URL").unwrap_or_else(|| "default".into());
        let mut base_url = if api_base_url == "default" {
            DEFAULT_API_BASE.to_string()
        } else {
            api_base_url
        };
        let trimmed = base_url.trim_end_matches('/');
        if !trimmed.ends_with("/v1") && !trimmed.contains("/v1/") {
            base_url = format!("{}/v1", trimmed);
        } else {
            base_url = trimmed.to_string();
        }
        let api_key = cfg.get("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        // A key is mandatory against the hosted default; self-hosted
        // endpoints may run without one.
        if api_key.is_none() && base_url.starts_with(DEFAULT_API_BASE) {
            return Err(AgentError::Authentication(
                "missing API key: pass --api-key or set OPENAI_API_KEY".into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| AgentError::Upstream(e.to_string()))?;

        Ok(Self { http, base_url, api_key })
    }

    fn headers(&self) -> Result<HeaderMap, AgentError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let hv = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| AgentError::Authentication(e.to_string()))?;
            headers.insert(AUTHORIZATION, hv);
        }
        Ok(headers)
    }

    pub fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        opts: ChatOptions,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, AgentError>> + Send>> {
        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let headers = self.headers();

        Box::pin(try_stream! {
            let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
            let mut headers = headers?;
            headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("text/event-stream"));

            debug!(model = %opts.model, n_messages = messages.len(), "chat completion request");

            let mut body = serde_json::json!({
                "model": opts.model,
                "temperature": opts.temperature,
                "top_p": opts.top_p,
                "messages": messages,
                "stream": true,
            });
            if let Some(mt) = opts.max_tokens {
                body["max_tokens"] = serde_json::json!(mt);
            }

            let resp = http
                .post(url)
                .headers(headers)
                .json(&body)
                .send()
                .await
                .map_err(|e| AgentError::Upstream(format!("failed to send chat request: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                Err(status_error(status, &text))?;
                return;
            }

            let mut buf = String::new();
            let mut stream = resp.bytes_stream();
            use futures_util::StreamExt as _;

            while let Some(chunk) = stream.next().await {
                let bytes = chunk.map_err(|e| AgentError::Upstream(format!("stream error: {e}")))?;
                buf.push_str(&String::from_utf8_lossy(&bytes));
                // process lines
                while let Some(pos) = buf.find('\n') {
                    let mut line = buf[..pos].to_string();
                    buf = buf[pos + 1..].to_string();
                    line = line.trim().to_string();
                    if line.is_empty() || line.starts_with(':') { continue; }
                    if let Some(payload) = line.strip_prefix("data:") {
                        let payload = payload.trim();
                        if payload == "[DONE]" { yield StreamEvent::Done; return; }
                        match serde_json::from_str::<Chunk>(payload) {
                            Ok(chunk) => {
                                for choice in chunk.choices.into_iter() {
                                    if let Some(delta) = choice.delta {
                                        if let Some(content) = delta.content {
                                            if !content.is_empty() {
                                                yield StreamEvent::Content(content);
                                            }
                                        }
                                    }
                                }
                            }
                            Err(_e) => {
                                // ignore malformed lines
                            }
                        }
                    }
                }
            }
            yield StreamEvent::Done;
        })
    }

    /// One blocking completion: streams and collects the full response text.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        opts: ChatOptions,
    ) -> Result<String, AgentError> {
        use futures_util::StreamExt as _;
        let mut stream = self.chat_stream(messages, opts);
        let mut text = String::new();
        while let Some(ev) = stream.next().await {
            match ev? {
                StreamEvent::Content(t) => text.push_str(&t),
                StreamEvent::Done => break,
            }
        }
        Ok(text)
    }

    /// List model ids visible to the configured key, gpt-4 family first.
    pub async fn list_models(&self) -> Result<Vec<String>, AgentError> {
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| AgentError::Upstream(format!("failed to list models: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let listing: ModelListing = resp
            .json()
            .await
            .map_err(|e| AgentError::Upstream(format!("malformed model listing: {e}")))?;
        let mut ids: Vec<String> = listing.data.into_iter().map(|m| m.id).collect();
        ids.sort_by_key(|id| {
            let lower = id.to_lowercase();
            if lower.contains("gpt-4") {
                (0, lower)
            } else if lower.contains("gpt-3.5") {
                (1, lower)
            } else {
                (2, lower)
            }
        });
        Ok(ids)
    }
}

fn status_error(status: StatusCode, body: &str) -> AgentError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Authentication(detail),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimit(detail),
        _ => AgentError::Upstream(detail),
    }
}

#[derive(Debug)]
pub enum StreamEvent {
    Content(String),
    Done,
}

// Minimal chunk structures for OpenAI-like streaming
#[derive(Debug, Deserialize)]
struct Chunk {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelListing {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_to_taxonomy() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            AgentError::Authentication(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            AgentError::RateLimit(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            AgentError::Upstream(_)
        ));
    }
}

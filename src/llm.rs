//! LLM access: a single chat-completion abstraction shared by the relevance scorer and
//! the page router, plus helpers to pull JSON out of free-form model output.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;

#[async_trait]
pub trait Completion: Send + Sync {
    /// One synchronous request/response round trip. `Err` means the model was unreachable.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
    fn provider_name(&self) -> &'static str;
}

pub type DynCompletion = Arc<dyn Completion>;

/// OpenAI-compatible Chat Completions client.
pub struct OpenAiCompletion {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl OpenAiCompletion {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("auto-update-scheduler/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(120))
            .build()
            .context("building llm http client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            max_tokens: cfg.max_tokens,
        })
    }
}

#[async_trait]
impl Completion for OpenAiCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("llm api key is empty");
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("llm request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("llm returned status {status}");
        }
        let body: Resp = resp.json().await.context("llm response body")?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("llm response had no choices"))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Used when the LLM is switched off: every call fails as "unavailable".
pub struct DisabledCompletion;

#[async_trait]
impl Completion for DisabledCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        bail!("llm disabled in configuration")
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

pub fn build_completion(cfg: &LlmConfig) -> Result<DynCompletion> {
    if !cfg.enabled {
        return Ok(Arc::new(DisabledCompletion));
    }
    Ok(Arc::new(OpenAiCompletion::new(cfg)?))
}

/// Slice from the first `open` to the last `close`. Tolerates code fences and chatter
/// around the payload.
fn extract_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_delimited(text, '{', '}')
}

pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_delimited(text, '[', ']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_from_fenced_output() {
        let raw = "Here you go:\n```json\n{\"a\": [1, 2]}\n```";
        assert_eq!(extract_json_object(raw), Some("{\"a\": [1, 2]}"));
        assert_eq!(extract_json_array("x [1] y"), Some("[1]"));
        assert_eq!(extract_json_object("no json"), None);
    }

    #[tokio::test]
    async fn disabled_completion_is_unavailable() {
        assert!(DisabledCompletion.complete("s", "u").await.is_err());
    }
}

// src/config/llm.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_max_tokens() -> u32 {
    4_000
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_model(),
            api_key: default_api_key(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    /// Resolve `api_key = "ENV"` and sanitize limits.
    pub fn resolve(mut self) -> anyhow::Result<Self> {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = if self.enabled {
                env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?
            } else {
                String::new()
            };
        }
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
        Ok(self)
    }
}

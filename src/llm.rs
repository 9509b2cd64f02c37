use anyhow::{Context, Result};
use async_trait::async_trait;
use ollama_rs::{generation::completion::request::GenerationRequest, Ollama};
use tracing::debug;

use crate::settings::LlmSettings;

/// A hosted text-generation model: prompt in, text out.
#[async_trait]
pub(crate) trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// A model served by a local Ollama instance.
pub(crate) struct OllamaModel {
    client: Ollama,
    model: String,
}

impl OllamaModel {
    pub(crate) fn new(settings: &LlmSettings) -> Self {
        Self {
            client: Ollama::new(settings.ollama_host.clone(), settings.ollama_port),
            model: settings.model.clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = std::time::Instant::now();
        let request = GenerationRequest::new(self.model.clone(), prompt.to_string());
        let response = self
            .client
            .generate(request)
            .await
            .with_context(|| format!("generation with model {} failed", self.model))?;
        debug!(
            model = %self.model,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Generated answer"
        );
        Ok(response.response)
    }
}

/// Answers every prompt with a fixed reply and remembers the last prompt.
#[cfg(test)]
pub(crate) struct StubModel {
    reply: Option<String>,
    last_prompt: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
impl StubModel {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            last_prompt: std::sync::Mutex::default(),
        }
    }

    /// A model whose every call fails.
    pub(crate) fn failing() -> Self {
        Self {
            reply: None,
            last_prompt: std::sync::Mutex::default(),
        }
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LanguageModel for StubModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| anyhow::anyhow!("model unavailable"))
    }
}

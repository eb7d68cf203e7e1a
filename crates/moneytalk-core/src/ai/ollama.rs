//! Ollama backend implementation
//!
//! Sends the rendered financial summary prompt to Ollama's chat endpoint as a
//! system message plus a user message and returns the assistant's reply.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::FinancialReport;
use crate::prompts::PromptLibrary;

use super::{report_messages, AIBackend};

/// Sampling temperature for narration; low to keep the model close to the data
const NARRATION_TEMPERATURE: f32 = 0.2;

#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OllamaBackend {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_prompts(base_url, model, PromptLibrary::new())
    }

    /// Create with a specific prompt library
    pub fn with_prompts(base_url: &str, model: &str, prompts: PromptLibrary) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            prompts: Arc::new(RwLock::new(prompts)),
        }
    }

    /// Same host and prompts, different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn explain_report(&self, report: &FinancialReport) -> Result<String> {
        let (system, user) = {
            let mut prompts = self
                .prompts
                .write()
                .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
            report_messages(&mut prompts, report)?
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system,
                },
                ChatMessage {
                    role: "user".into(),
                    content: user,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: NARRATION_TEMPERATURE,
            },
        };

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let chat: ChatResponse = response.json().await?;
        debug!(model = %self.model, chars = chat.message.content.len(), "Ollama chat response");

        let text = chat.message.content.trim();
        if text.is_empty() {
            return Err(Error::Ai("Ollama returned an empty response".into()));
        }
        Ok(text.to_string())
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::empty_report;
    use crate::test_utils::MockOllamaServer;

    #[test]
    fn test_trailing_slash_trimmed() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
        assert_eq!(backend.with_model("gemma3").model(), "gemma3");
    }

    #[tokio::test]
    async fn test_explain_report_via_mock_server() {
        let mut server = MockOllamaServer::start().await;
        let backend =
            OllamaBackend::with_prompts(&server.url(), "llama3.2", PromptLibrary::embedded_only());

        assert!(backend.health_check().await);
        let text = backend
            .explain_report(&empty_report(2024, 6).unwrap())
            .await
            .unwrap();
        assert!(text.contains("June 2024"));

        server.stop();
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = MockOllamaServer::start_failing().await;
        let backend =
            OllamaBackend::with_prompts(&server.url(), "llama3.2", PromptLibrary::embedded_only());

        let err = backend
            .explain_report(&empty_report(2024, 6).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));

        server.stop();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unhealthy() {
        let backend = OllamaBackend::new("http://127.0.0.1:1", "llama3.2");
        assert!(!backend.health_check().await);
    }
}

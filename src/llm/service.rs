use std::sync::Arc;
use std::time::Duration;

use crate::core::config::AppConfig;
use crate::core::errors::ApiError;
use crate::llm::openai::OpenAiProvider;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatMessage, ChatRequest, ChatResponse, ToolDefinition};

/// Provider bound to the configured chat and embedding models.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    model: String,
    embedding_model: String,
    temperature: f64,
    embed_batch_size: usize,
}

impl LlmService {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
        temperature: f64,
        embed_batch_size: usize,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            embedding_model: embedding_model.into(),
            temperature,
            embed_batch_size: embed_batch_size.max(1),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        if config.llm.api_key.is_none() {
            tracing::warn!("No LLM api key configured; set OPENAI_API_KEY");
        }
        let provider = OpenAiProvider::new(
            config.llm.base_url.clone(),
            config.llm.api_key.clone(),
            Duration::from_secs(config.llm.request_timeout_secs),
        )?;
        Ok(Self::new(
            Arc::new(provider),
            config.llm.model.clone(),
            config.llm.embedding_model.clone(),
            config.llm.temperature,
            config.ingest.embed_batch_size,
        ))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await.unwrap_or(false)
    }

    /// Single-prompt completion.
    pub async fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let response = self
            .chat(vec![ChatMessage::user(prompt)], Vec::new())
            .await?;
        Ok(response.content)
    }

    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ChatResponse, ApiError> {
        let request = ChatRequest::new(messages)
            .with_tools(tools)
            .with_temperature(self.temperature);
        self.provider.chat(request, &self.model).await
    }

    /// Embed texts in batches of `embed_batch_size`, preserving order.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.embed_batch_size) {
            let mut batch_vectors = self.provider.embed(batch, &self.embedding_model).await?;
            vectors.append(&mut batch_vectors);
        }
        Ok(vectors)
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self
            .provider
            .embed(&[text.to_string()], &self.embedding_model)
            .await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Upstream("empty embedding response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;

    #[tokio::test]
    async fn embed_batches_and_keeps_order() {
        let provider = Arc::new(ScriptedLlm::new(Vec::<&str>::new()));
        let service = LlmService::new(provider.clone(), "chat", "embed", 0.0, 2);

        let texts: Vec<String> = ["alpha", "beta", "gamma"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let vectors = service.embed(&texts).await.unwrap();

        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], ScriptedLlm::embedding_for("alpha"));
        assert_eq!(vectors[2], ScriptedLlm::embedding_for("gamma"));
        assert_eq!(provider.embed_batches(), vec![2, 1]);
    }

    #[tokio::test]
    async fn complete_sends_single_user_message_with_temperature() {
        let provider = Arc::new(ScriptedLlm::new(["an outline"]));
        let service = LlmService::new(provider.clone(), "gpt-4o-mini", "embed", 0.01, 8);

        let text = service.complete("write an outline").await.unwrap();

        assert_eq!(text, "an outline");
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages, vec![ChatMessage::user("write an outline")]);
        assert_eq!(requests[0].temperature, Some(0.01));
        assert!(requests[0].tools.is_empty());
    }
}

//! In-process fakes shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::ingest::{DocumentParser, ParsedDocument};
use crate::llm::{ChatRequest, ChatResponse, LlmProvider, LlmService};

type Handler = Box<dyn Fn(&ChatRequest) -> Result<ChatResponse, ApiError> + Send + Sync>;

const EMBED_DIM: usize = 16;

/// LLM provider answering from a queue or a handler, recording every request.
pub struct ScriptedLlm {
    queue: Mutex<VecDeque<ChatResponse>>,
    handler: Option<Handler>,
    requests: Mutex<Vec<ChatRequest>>,
    embed_batches: Mutex<Vec<usize>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_responses(responses.into_iter().map(ChatResponse::text).collect())
    }

    pub fn with_responses(responses: Vec<ChatResponse>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            handler: None,
            requests: Mutex::new(Vec::new()),
            embed_batches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<ChatResponse, ApiError> + Send + Sync + 'static,
    {
        Self {
            queue: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(handler)),
            requests: Mutex::new(Vec::new()),
            embed_batches: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn embed_batches(&self) -> Vec<usize> {
        self.embed_batches.lock().unwrap().clone()
    }

    /// Bag-of-words vector: each lowercase word bumps one bucket.
    pub fn embedding_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; EMBED_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
                % EMBED_DIM;
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<ChatResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(handler) = &self.handler {
            return handler(&request);
        }
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::Internal("scripted responses exhausted".to_string()))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_batches.lock().unwrap().push(inputs.len());
        Ok(inputs.iter().map(|text| Self::embedding_for(text)).collect())
    }
}

pub fn scripted_service(provider: Arc<ScriptedLlm>) -> LlmService {
    LlmService::new(provider, "test-chat", "test-embed", 0.01, 64)
}

/// Parser serving canned text keyed by file name.
#[derive(Default)]
pub struct FakeParser {
    documents: HashMap<String, String>,
}

impl FakeParser {
    pub fn with_document(mut self, file_name: &str, text: &str) -> Self {
        self.documents
            .insert(file_name.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl DocumentParser for FakeParser {
    async fn parse(&self, path: &Path) -> Result<Vec<ParsedDocument>, ApiError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let text = self
            .documents
            .get(&name)
            .ok_or_else(|| ApiError::NotFound(name.clone()))?;
        Ok(vec![ParsedDocument {
            text: text.clone(),
            source: name,
        }])
    }
}

//! LLM-backed analysis provider (OpenAI-compatible chat + embeddings API).
//! Grounded on the OpenAI-call shape used for embeddings elsewhere in this
//! codebase, extended to chat completions for summarization, entity
//! extraction, and citation-intent classification.

use std::sync::Arc;

use async_trait::async_trait;
use litgraph_common::config::ProviderConfig;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::client::ProviderClient;
use crate::error::ProviderError;
use crate::model::{CitationClassification, ConceptRecord, SummaryLevel};
use crate::retry::{NoopRetryObserver, RetryObserver};
use crate::traits::AnalysisProvider;
use litgraph_common::entities::{CitationIntent, CitationPosition};

const CHAT_PATH: &str = "/chat/completions";
const EMBEDDINGS_PATH: &str = "/embeddings";

pub struct LlmAnalysisProvider {
    client: ProviderClient,
    chat_model: String,
    embedding_model: String,
}

impl LlmAnalysisProvider {
    pub fn new(cfg: ProviderConfig, chat_model: impl Into<String>, embedding_model: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_observer(cfg, chat_model, embedding_model, Arc::new(NoopRetryObserver))
    }

    /// Same as [`Self::new`], but retries are reported to `observer` (spec
    /// §4.1's observability counter) instead of discarded.
    pub fn with_observer(
        cfg: ProviderConfig,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
        observer: Arc<dyn RetryObserver>,
    ) -> Result<Self, ProviderError> {
        let client = ProviderClient::with_observer("llm", cfg, &[], observer)?;
        Ok(Self { client, chat_model: chat_model.into(), embedding_model: embedding_model.into() })
    }

    async fn chat(&self, system: &str, user: &str, cancel: &CancellationToken) -> Result<String, ProviderError> {
        let url = format!("{}{CHAT_PATH}", self.client.base_url());
        let body = ChatRequest {
            model: self.chat_model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: system.to_string() },
                ChatMessage { role: "user".to_string(), content: user.to_string() },
            ],
            temperature: 0.0,
        };
        let resp: ChatResponse = self.client.post_json(&url, &body, cancel).await?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidInput("empty chat completion".to_string()))
    }
}

#[async_trait]
impl AnalysisProvider for LlmAnalysisProvider {
    fn name(&self) -> &'static str {
        "llm"
    }

    #[instrument(skip(self, text, cancel))]
    async fn summarize(&self, text: &str, level: SummaryLevel, cancel: &CancellationToken) -> Result<String, ProviderError> {
        let instruction = match level {
            SummaryLevel::Brief => "Summarize the following paper abstract in one sentence.",
            SummaryLevel::Standard => "Summarize the following paper in a short paragraph.",
            SummaryLevel::Detailed => "Write a detailed, multi-paragraph summary of the following paper.",
        };
        self.chat(instruction, text, cancel).await
    }

    #[instrument(skip(self, text, cancel))]
    async fn extract_entities(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<ConceptRecord>, ProviderError> {
        let instruction = "Extract the key methods, theorems, datasets, equations, and constants \
            mentioned in the following text. Respond with a JSON array of objects with fields \
            \"name\", \"kind\" (one of method, theorem, dataset, equation, constant, conjecture, other), \
            and \"confidence\" (0.0-1.0).";
        let raw = self.chat(instruction, text, cancel).await?;
        serde_json::from_str(&raw).map_err(|e| ProviderError::InvalidInput(format!("entity extraction response not valid JSON: {e}")))
    }

    #[instrument(skip(self, context, cancel))]
    async fn classify_citation(&self, context: &str, cancel: &CancellationToken) -> Result<CitationClassification, ProviderError> {
        let instruction = "Classify the following citation context. Respond with JSON \
            {\"intent\": one of method|background|result|critique|extension|unknown, \
            \"position\": one of abstract|introduction|methods|results|discussion|other}.";
        let raw = self.chat(instruction, context, cancel).await?;
        let parsed: RawClassification = serde_json::from_str(&raw)
            .map_err(|e| ProviderError::InvalidInput(format!("classification response not valid JSON: {e}")))?;
        Ok(CitationClassification { intent: parsed.intent.into(), position: parsed.position.into() })
    }

    #[instrument(skip(self, text, cancel))]
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}{EMBEDDINGS_PATH}", self.client.base_url());
        let body = EmbeddingRequest { model: self.embedding_model.clone(), input: text.to_string() };
        let resp: EmbeddingResponse = self.client.post_json(&url, &body, cancel).await?;
        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::InvalidInput("empty embedding response".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawIntent {
    Method,
    Background,
    Result,
    Critique,
    Extension,
    Unknown,
}

impl From<RawIntent> for CitationIntent {
    fn from(r: RawIntent) -> Self {
        match r {
            RawIntent::Method => CitationIntent::Method,
            RawIntent::Background => CitationIntent::Background,
            RawIntent::Result => CitationIntent::Result,
            RawIntent::Critique => CitationIntent::Critique,
            RawIntent::Extension => CitationIntent::Extension,
            RawIntent::Unknown => CitationIntent::Unknown,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawPosition {
    Abstract,
    Introduction,
    Methods,
    Results,
    Discussion,
    Other,
}

impl From<RawPosition> for CitationPosition {
    fn from(r: RawPosition) -> Self {
        match r {
            RawPosition::Abstract => CitationPosition::Abstract,
            RawPosition::Introduction => CitationPosition::Introduction,
            RawPosition::Methods => CitationPosition::Methods,
            RawPosition::Results => CitationPosition::Results,
            RawPosition::Discussion => CitationPosition::Discussion,
            RawPosition::Other => CitationPosition::Other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    intent: RawIntent,
    position: RawPosition,
}

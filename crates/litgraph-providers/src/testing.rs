//! In-memory stub providers for use in downstream crates' tests. There is no
//! mocking framework in this workspace's dependency stack, so test doubles
//! are hand-written fakes, same as elsewhere in this codebase.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use litgraph_common::entities::{CitationIntent, CitationPosition};
use litgraph_common::PaperId;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::model::{CitationClassification, CitationPage, CitationRef, ConceptRecord, Cursor, PaperRecord, SummaryLevel};
use crate::traits::{AnalysisProvider, MetadataProvider};

/// A `MetadataProvider` backed by an in-memory map, for discovery/pipeline tests.
pub struct StubMetadataProvider {
    papers: Mutex<HashMap<PaperId, PaperRecord>>,
    citations: Mutex<HashMap<PaperId, Vec<CitationRef>>>,
    references: Mutex<HashMap<PaperId, Vec<CitationRef>>>,
}

impl StubMetadataProvider {
    pub fn new() -> Self {
        Self {
            papers: Mutex::new(HashMap::new()),
            citations: Mutex::new(HashMap::new()),
            references: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_paper(self, paper: PaperRecord) -> Self {
        self.papers.lock().unwrap().insert(paper.id.clone(), paper);
        self
    }

    pub fn with_citations(self, id: PaperId, refs: Vec<CitationRef>) -> Self {
        self.citations.lock().unwrap().insert(id, refs);
        self
    }

    pub fn with_references(self, id: PaperId, refs: Vec<CitationRef>) -> Self {
        self.references.lock().unwrap().insert(id, refs);
        self
    }
}

impl Default for StubMetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataProvider for StubMetadataProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn get_paper(&self, id: &PaperId, _cancel: &CancellationToken) -> Result<PaperRecord, ProviderError> {
        self.papers.lock().unwrap().get(id).cloned().ok_or(ProviderError::NotFound)
    }

    async fn get_citations(&self, id: &PaperId, _cursor: Cursor, _cancel: &CancellationToken) -> Result<CitationPage, ProviderError> {
        let items = self.citations.lock().unwrap().get(id).cloned().unwrap_or_default();
        Ok(CitationPage { items, next: Cursor(None) })
    }

    async fn get_references(&self, id: &PaperId, _cursor: Cursor, _cancel: &CancellationToken) -> Result<CitationPage, ProviderError> {
        let items = self.references.lock().unwrap().get(id).cloned().unwrap_or_default();
        Ok(CitationPage { items, next: Cursor(None) })
    }
}

/// A canned response for `StubAnalysisProvider`, shared across all of its operations.
#[derive(Clone)]
pub enum StubOutcome {
    Summary(String),
    Error(ProviderError),
}

/// An `AnalysisProvider` that always returns one canned outcome, for testing
/// fallback selection and pipeline error propagation without network calls.
pub struct StubAnalysisProvider {
    outcome: StubOutcome,
}

impl StubAnalysisProvider {
    pub fn new(outcome: StubOutcome) -> Self {
        Self { outcome }
    }
}

#[async_trait]
impl AnalysisProvider for StubAnalysisProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn summarize(&self, _text: &str, _level: SummaryLevel, _cancel: &CancellationToken) -> Result<String, ProviderError> {
        match &self.outcome {
            StubOutcome::Summary(s) => Ok(s.clone()),
            StubOutcome::Error(e) => Err(e.clone()),
        }
    }

    async fn extract_entities(&self, _text: &str, _cancel: &CancellationToken) -> Result<Vec<ConceptRecord>, ProviderError> {
        match &self.outcome {
            StubOutcome::Summary(_) => Ok(vec![]),
            StubOutcome::Error(e) => Err(e.clone()),
        }
    }

    async fn classify_citation(&self, _context: &str, _cancel: &CancellationToken) -> Result<CitationClassification, ProviderError> {
        match &self.outcome {
            StubOutcome::Summary(_) => Ok(CitationClassification { intent: CitationIntent::Unknown, position: CitationPosition::Other }),
            StubOutcome::Error(e) => Err(e.clone()),
        }
    }

    async fn embed(&self, _text: &str, _cancel: &CancellationToken) -> Result<Vec<f32>, ProviderError> {
        match &self.outcome {
            StubOutcome::Summary(_) => Ok(vec![0.0; 8]),
            StubOutcome::Error(e) => Err(e.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_metadata_provider_returns_registered_paper() {
        let provider = StubMetadataProvider::new().with_paper(PaperRecord {
            id: PaperId::new("2301.00001"),
            title: "Example".to_string(),
            abstract_text: None,
            authors: vec![],
            categories: vec![],
            published_date: None,
            citation_count: None,
        });
        let cancel = CancellationToken::new();
        let paper = provider.get_paper(&PaperId::new("2301.00001"), &cancel).await.unwrap();
        assert_eq!(paper.title, "Example");
    }

    #[tokio::test]
    async fn stub_metadata_provider_missing_paper_is_not_found() {
        let provider = StubMetadataProvider::new();
        let cancel = CancellationToken::new();
        let result = provider.get_paper(&PaperId::new("missing"), &cancel).await;
        assert_eq!(result.unwrap_err(), ProviderError::NotFound);
    }
}

//! The two provider seams: metadata/citation lookup and content analysis
//! (spec §4.1). Every operation accepts a `CancellationToken` so long-running
//! fetch loops can be aborted promptly at suspension points (spec §5).

use async_trait::async_trait;
use litgraph_common::PaperId;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::model::{CitationClassification, ConceptRecord, CitationPage, Cursor, PaperRecord, SummaryLevel};

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Human-readable name, used for logging and observability tagging.
    fn name(&self) -> &'static str;

    async fn get_paper(&self, id: &PaperId, cancel: &CancellationToken) -> Result<PaperRecord, ProviderError>;

    /// Papers that cite this one (incoming edges), paginated.
    async fn get_citations(
        &self,
        id: &PaperId,
        cursor: Cursor,
        cancel: &CancellationToken,
    ) -> Result<CitationPage, ProviderError>;

    /// Citations this paper makes (outgoing edges), paginated.
    async fn get_references(
        &self,
        id: &PaperId,
        cursor: Cursor,
        cancel: &CancellationToken,
    ) -> Result<CitationPage, ProviderError>;
}

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn summarize(
        &self,
        text: &str,
        level: SummaryLevel,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError>;

    async fn extract_entities(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<ConceptRecord>, ProviderError>;

    async fn classify_citation(
        &self,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<CitationClassification, ProviderError>;

    async fn embed(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>, ProviderError>;
}

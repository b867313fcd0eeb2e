//! The analyzer itself: turns a paper plus its incoming citation contexts
//! into an `EnrichmentRecord`, tolerating partial sub-step failure and
//! short-circuiting when a cached record is still fresh (spec §4.3).

use litgraph_common::PaperId;
use litgraph_providers::model::{CitationClassification, PaperRecord, SummaryLevel};
use litgraph_providers::{AnalysisProvider, ProviderError};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::extractor::ContentExtractor;
use crate::record::{AnalysisErrors, EdgeLabel, EnrichmentRecord};

/// One incoming citation context this paper needs classified, identified by
/// the paper on the other end of the edge.
pub struct CitationContext {
    pub other_id: PaperId,
    pub text: String,
}

/// Identifies whether a cached enrichment record is still usable, avoiding
/// redundant provider calls for papers already analyzed by a prior run
/// (spec §4.3 "skip re-analysis when cached results are up to date").
pub struct CacheFreshness {
    pub record: EnrichmentRecord,
    pub is_fresh: bool,
}

pub struct Analyzer<'a> {
    provider: &'a dyn AnalysisProvider,
    extractor: &'a dyn ContentExtractor,
    summary_level: SummaryLevel,
}

impl<'a> Analyzer<'a> {
    pub fn new(provider: &'a dyn AnalysisProvider, extractor: &'a dyn ContentExtractor, summary_level: SummaryLevel) -> Self {
        Self { provider, extractor, summary_level }
    }

    /// Analyze one paper. `cached` is consulted first; if it reports a fresh
    /// record, that record is returned unchanged and no provider calls are
    /// made for this paper.
    #[instrument(skip(self, paper, citations, cached, cancel), fields(paper_id = paper.id.as_str()))]
    pub async fn analyze(
        &self,
        paper: &PaperRecord,
        citations: &[CitationContext],
        cached: Option<CacheFreshness>,
        cancel: &CancellationToken,
    ) -> EnrichmentRecord {
        if let Some(cached) = cached {
            if cached.is_fresh {
                let mut record = cached.record;
                record.from_cache = true;
                return record;
            }
        }

        let mut record = EnrichmentRecord { paper_id: Some(paper.id.clone()), ..Default::default() };

        let Some(text) = self.extractor.extract_text(paper) else {
            record.errors.summary = Some("no extractable text".to_string());
            record.errors.concepts = Some("no extractable text".to_string());
            record.errors.embedding = Some("no extractable text".to_string());
            return record;
        };

        if cancel.is_cancelled() {
            return cancelled_record(paper.id.clone());
        }
        match self.provider.summarize(&text, self.summary_level, cancel).await {
            Ok(summary) => record.summary = Some(summary),
            Err(e) => {
                warn!(error = %e, "summarization failed");
                record.errors.summary = Some(e.to_string());
            }
        }

        if cancel.is_cancelled() {
            return cancelled_record(paper.id.clone());
        }
        match self.provider.extract_entities(&text, cancel).await {
            Ok(concepts) => record.concepts = concepts,
            Err(e) => {
                warn!(error = %e, "entity extraction failed");
                record.errors.concepts = Some(e.to_string());
            }
        }

        if cancel.is_cancelled() {
            return cancelled_record(paper.id.clone());
        }
        record.edge_labels = self.classify_citations(citations, cancel).await;

        if cancel.is_cancelled() {
            return cancelled_record(paper.id.clone());
        }
        match self.provider.embed(&text, cancel).await {
            Ok(embedding) => record.embedding = Some(embedding),
            Err(e) => {
                warn!(error = %e, "embedding failed");
                record.errors.embedding = Some(e.to_string());
            }
        }

        record
    }

    async fn classify_citations(&self, citations: &[CitationContext], cancel: &CancellationToken) -> Vec<EdgeLabel> {
        let mut labels = Vec::with_capacity(citations.len());
        for ctx in citations {
            if cancel.is_cancelled() {
                break;
            }
            match self.provider.classify_citation(&ctx.text, cancel).await {
                Ok(CitationClassification { intent, position }) => {
                    labels.push(EdgeLabel { other_id: ctx.other_id.clone(), intent, position });
                }
                Err(e) => {
                    warn!(other_id = ctx.other_id.as_str(), error = %e, "citation classification failed");
                }
            }
        }
        labels
    }
}

fn cancelled_record(paper_id: PaperId) -> EnrichmentRecord {
    let msg = ProviderError::Cancelled.to_string();
    EnrichmentRecord {
        paper_id: Some(paper_id),
        errors: AnalysisErrors { summary: Some(msg.clone()), concepts: Some(msg.clone()), edge_labels: Some(msg.clone()), embedding: Some(msg) },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::AbstractOnlyExtractor;
    use litgraph_providers::testing::{StubAnalysisProvider, StubOutcome};

    fn paper_with_abstract(text: &str) -> PaperRecord {
        PaperRecord {
            id: PaperId::new("p1"),
            title: "T".to_string(),
            abstract_text: Some(text.to_string()),
            authors: vec![],
            categories: vec![],
            published_date: None,
            citation_count: None,
        }
    }

    #[tokio::test]
    async fn successful_analysis_populates_all_fields() {
        let provider = StubAnalysisProvider::new(StubOutcome::Summary("a summary".to_string()));
        let extractor = AbstractOnlyExtractor;
        let analyzer = Analyzer::new(&provider, &extractor, SummaryLevel::Brief);
        let cancel = CancellationToken::new();

        let record = analyzer.analyze(&paper_with_abstract("some text"), &[], None, &cancel).await;
        assert_eq!(record.summary, Some("a summary".to_string()));
        assert!(record.embedding.is_some());
        assert!(record.is_fully_succeeded());
        assert!(!record.from_cache);
    }

    #[tokio::test]
    async fn provider_failure_is_tolerated_as_partial_result() {
        let provider = StubAnalysisProvider::new(StubOutcome::Error(ProviderError::Unavailable));
        let extractor = AbstractOnlyExtractor;
        let analyzer = Analyzer::new(&provider, &extractor, SummaryLevel::Brief);
        let cancel = CancellationToken::new();

        let record = analyzer.analyze(&paper_with_abstract("some text"), &[], None, &cancel).await;
        assert!(record.summary.is_none());
        assert!(record.errors.summary.is_some());
        assert!(!record.is_fully_succeeded());
    }

    #[tokio::test]
    async fn missing_text_short_circuits_without_calling_provider() {
        let provider = StubAnalysisProvider::new(StubOutcome::Error(ProviderError::Unavailable));
        let extractor = AbstractOnlyExtractor;
        let analyzer = Analyzer::new(&provider, &extractor, SummaryLevel::Brief);
        let cancel = CancellationToken::new();

        let paper = paper_with_abstract("");
        let record = analyzer.analyze(&paper, &[], None, &cancel).await;
        assert!(record.summary.is_none());
        assert_eq!(record.errors.summary, Some("no extractable text".to_string()));
    }

    #[tokio::test]
    async fn fresh_cached_record_short_circuits() {
        let provider = StubAnalysisProvider::new(StubOutcome::Error(ProviderError::Unavailable));
        let extractor = AbstractOnlyExtractor;
        let analyzer = Analyzer::new(&provider, &extractor, SummaryLevel::Brief);
        let cancel = CancellationToken::new();

        let cached_record = EnrichmentRecord { summary: Some("cached".to_string()), ..Default::default() };
        let cached = CacheFreshness { record: cached_record, is_fresh: true };

        let record = analyzer.analyze(&paper_with_abstract("text"), &[], Some(cached), &cancel).await;
        assert_eq!(record.summary, Some("cached".to_string()));
        assert!(record.from_cache);
    }

    #[tokio::test]
    async fn cancellation_between_substeps_stops_further_work() {
        let provider = StubAnalysisProvider::new(StubOutcome::Summary("s".to_string()));
        let extractor = AbstractOnlyExtractor;
        let analyzer = Analyzer::new(&provider, &extractor, SummaryLevel::Brief);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let record = analyzer.analyze(&paper_with_abstract("text"), &[], None, &cancel).await;
        assert!(record.summary.is_none());
        assert!(record.errors.summary.is_some());
    }
}

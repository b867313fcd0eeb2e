//! The per-paper enrichment record produced by the analyzer (spec §4.3).

use litgraph_common::entities::{CitationIntent, CitationPosition};
use litgraph_common::PaperId;
use litgraph_providers::model::ConceptRecord;

/// A classified citation, keyed by the cited/citing paper on the other end
/// of the edge (spec §4.3 edge_labels).
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLabel {
    pub other_id: PaperId,
    pub intent: CitationIntent,
    pub position: CitationPosition,
}

/// Which sub-steps of analysis succeeded, so a partial failure in one
/// sub-step (e.g. embedding backend down) doesn't discard summary/concepts
/// already produced (spec §4.3 partial-result tolerance).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisErrors {
    pub summary: Option<String>,
    pub concepts: Option<String>,
    pub edge_labels: Option<String>,
    pub embedding: Option<String>,
}

impl AnalysisErrors {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.concepts.is_none() && self.edge_labels.is_none() && self.embedding.is_none()
    }
}

/// The enrichment output for one paper. Any field may be `None` if that
/// sub-step failed or had no input; `errors` records why.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnrichmentRecord {
    pub paper_id: Option<PaperId>,
    pub summary: Option<String>,
    pub concepts: Vec<ConceptRecord>,
    pub edge_labels: Vec<EdgeLabel>,
    pub embedding: Option<Vec<f32>>,
    pub errors: AnalysisErrors,
    /// True if this record was served from a prior run's cache rather than
    /// freshly computed (spec §4.3 short-circuit on up-to-date results).
    pub from_cache: bool,
}

impl EnrichmentRecord {
    pub fn is_fully_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

//! Wire-level shapes returned by providers, distinct from the persisted
//! entities in `litgraph_common::entities` (spec §3, §4.1).

use chrono::NaiveDate;
use litgraph_common::entities::{CitationIntent, CitationPosition};
use litgraph_common::PaperId;
use serde::{Deserialize, Serialize};

/// Metadata-only view of a paper as returned by a `MetadataProvider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: PaperId,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub published_date: Option<NaiveDate>,
    pub citation_count: Option<u64>,
}

/// A single directed citation reference, with an optional surrounding
/// context snippet used downstream by the analyzer for intent/position
/// classification (spec §4.1 get_citations/get_references).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRef {
    pub other_id: PaperId,
    pub context: Option<String>,
}

/// Opaque pagination cursor; callers must not assume any internal structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Cursor(pub Option<String>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationPage {
    pub items: Vec<CitationRef>,
    pub next: Cursor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryLevel {
    Brief,
    Standard,
    Detailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRecord {
    pub name: String,
    pub kind: String,
    pub confidence: Option<f32>,
}

/// Result of classifying one citation edge (spec §4.1 classify_citation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationClassification {
    pub intent: CitationIntent,
    pub position: CitationPosition,
}

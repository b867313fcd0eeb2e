//! Core data model: Paper, CitationEdge, Concept, MentionsEdge (spec §3).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::PaperId;

/// A paper node. Created the first time its id is observed by discovery;
/// attributes are filled in later by the metadata provider and the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Paper {
    pub id: Option<PaperId>,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub published_date: Option<NaiveDate>,
    pub citation_count: Option<u64>,
    pub tl_dr: Option<String>,
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
    /// Set by the analyzer when a near-identical abstract already exists
    /// under a different id (see SPEC_FULL.md's SimHash guard). Informational
    /// only — never used to drop or merge ids.
    pub duplicate_of: Option<PaperId>,
}

impl Paper {
    /// A stub paper: id known, nothing else resolved yet. Created to satisfy
    /// an edge endpoint (spec §3 invariant 1, "Stub Paper" in the glossary).
    pub fn stub(id: PaperId) -> Self {
        Self { id: Some(id), ..Default::default() }
    }

    pub fn is_stub(&self) -> bool {
        self.title.is_empty() && self.abstract_text.is_none()
    }
}

/// Where in the citing paper a reference appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationPosition {
    Abstract,
    Introduction,
    Methods,
    Results,
    Discussion,
    Other,
}

/// Why a paper cites another (classified by the analysis provider).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationIntent {
    Method,
    Background,
    Result,
    Critique,
    Extension,
    Unknown,
}

impl Default for CitationIntent {
    fn default() -> Self {
        CitationIntent::Unknown
    }
}

impl Default for CitationPosition {
    fn default() -> Self {
        CitationPosition::Other
    }
}

/// A directed citation edge `src -> dst`. At most one per (src, dst) pair;
/// a later observation updates attributes, never duplicates (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationEdge {
    pub src: PaperId,
    pub dst: PaperId,
    pub intent: CitationIntent,
    pub position: CitationPosition,
    pub context: Option<String>,
}

impl CitationEdge {
    /// Merge policy for edge upserts: existing attributes are overwritten
    /// only by non-null incoming values (spec §4.4).
    pub fn merge(&mut self, incoming: &CitationEdge) {
        if incoming.intent != CitationIntent::Unknown {
            self.intent = incoming.intent;
        }
        if incoming.position != CitationPosition::Other {
            self.position = incoming.position;
        }
        if incoming.context.is_some() {
            self.context = incoming.context.clone();
        }
    }
}

/// Kind of concept mentioned in a paper (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptKind {
    Method,
    Theorem,
    Dataset,
    Equation,
    Constant,
    Conjecture,
    Other,
}

/// A named concept (method, theorem, dataset, ...). Uniqueness key is
/// `(normalized_name, kind)` — case-insensitive, whitespace-normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    pub kind: ConceptKind,
    pub embedding: Option<Vec<f32>>,
}

impl Concept {
    /// Case-insensitive, whitespace-normalized uniqueness key (spec §3 invariant 4).
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// A paper mentioning a concept, with optional extraction confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionsEdge {
    pub paper: PaperId,
    pub concept_name: String,
    pub concept_kind: ConceptKind,
    pub confidence: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_paper_has_no_title_or_abstract() {
        let p = Paper::stub(PaperId::new("P1"));
        assert!(p.is_stub());
        assert_eq!(p.id.unwrap().as_str(), "P1");
    }

    #[test]
    fn concept_name_normalization_is_case_and_space_insensitive() {
        let a = Concept { name: "  Transformer   Model ".into(), kind: ConceptKind::Method, embedding: None };
        let b = Concept { name: "transformer model".into(), kind: ConceptKind::Method, embedding: None };
        assert_eq!(a.normalized_name(), b.normalized_name());
    }

    #[test]
    fn merge_preserves_non_null_over_null() {
        let mut existing = CitationEdge {
            src: PaperId::new("A"), dst: PaperId::new("B"),
            intent: CitationIntent::Method, position: CitationPosition::Methods,
            context: Some("uses the same loss".into()),
        };
        let incoming = CitationEdge {
            src: PaperId::new("A"), dst: PaperId::new("B"),
            intent: CitationIntent::Unknown, position: CitationPosition::Other,
            context: None,
        };
        existing.merge(&incoming);
        assert_eq!(existing.intent, CitationIntent::Method);
        assert_eq!(existing.context.as_deref(), Some("uses the same loss"));
    }
}

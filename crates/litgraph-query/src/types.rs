//! Read-facade response shapes (spec §4.6). These are distinct from
//! `litgraph_common::entities::Paper` because a query response is a
//! projection, not the persisted node: no embedding vector, and the
//! citation/reference lists are populated on demand.

use litgraph_common::entities::Paper;
use litgraph_common::PaperId;
use serde::Serialize;

/// A compact row for `list_papers` and search results.
#[derive(Debug, Clone, Serialize)]
pub struct PaperSummary {
    pub id: PaperId,
    pub title: String,
    pub categories: Vec<String>,
    pub citation_count: Option<u64>,
}

impl From<&Paper> for PaperSummary {
    fn from(p: &Paper) -> Self {
        Self {
            id: p.id.clone().unwrap_or_else(|| PaperId::new("")),
            title: p.title.clone(),
            categories: p.categories.clone(),
            citation_count: p.citation_count,
        }
    }
}

/// Full detail for `get_paper`, with citing/cited ids filled in only when
/// requested.
#[derive(Debug, Clone, Serialize)]
pub struct PaperDetail {
    pub id: PaperId,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub citation_count: Option<u64>,
    pub tl_dr: Option<String>,
    pub summary: Option<String>,
    /// Papers that cite this one, present only if requested.
    pub citations: Option<Vec<PaperId>>,
    /// Papers this one cites, present only if requested.
    pub references: Option<Vec<PaperId>>,
}

/// One page of `list_papers`.
#[derive(Debug, Clone, Serialize)]
pub struct PaperPage {
    pub items: Vec<PaperSummary>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

/// A scored search hit; `score` is in `[0, 1]` for both plain semantic
/// search (cosine similarity, rescaled) and hybrid search (fused score).
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPaper {
    pub paper: PaperSummary,
    pub score: f64,
}

/// One hop of a citation-neighborhood BFS result.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodEdge {
    pub src: PaperId,
    pub dst: PaperId,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitationNeighborhood {
    pub nodes: Vec<PaperId>,
    pub edges: Vec<NeighborhoodEdge>,
}

/// One connected cluster of papers, found via citation-edge community
/// detection (spec §4.6 `clusters`).
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub id: u64,
    pub members: Vec<PaperId>,
    pub label: Option<String>,
}

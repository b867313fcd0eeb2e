//! The read facade (C6): query operations over the completed store.
//! Every method here is non-mutating and safe to call while a pipeline
//! run is writing to the same store (spec §4.6).

use std::sync::Arc;

use litgraph_common::scoring::{fuse_scores, z_normalize_citations, DEFAULT_HYBRID_ALPHA};
use litgraph_common::PaperId;
use litgraph_providers::AnalysisProvider;
use litgraph_store::{GraphStore, VectorStore};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::clustering::connected_components;
use crate::error::QueryError;
use crate::types::{
    CitationNeighborhood, Cluster, NeighborhoodEdge, PaperDetail, PaperPage, PaperSummary, ScoredPaper,
};

/// Papers considered for re-scoring in `hybrid_search`, as a multiple of
/// the requested result count (spec §4.6: "top 3·limit by vector similarity").
const HYBRID_CANDIDATE_MULTIPLIER: usize = 3;

pub struct QueryFacade<A, G, V> {
    analysis: Arc<A>,
    graph: Arc<G>,
    vector: Arc<V>,
}

impl<A, G, V> QueryFacade<A, G, V>
where
    A: AnalysisProvider,
    G: GraphStore,
    V: VectorStore,
{
    pub fn new(analysis: Arc<A>, graph: Arc<G>, vector: Arc<V>) -> Self {
        Self { analysis, graph, vector }
    }

    #[instrument(skip(self))]
    pub async fn get_paper(
        &self,
        id: &PaperId,
        include_citations: bool,
        include_references: bool,
    ) -> Result<PaperDetail, QueryError> {
        let paper = self.graph.get_paper(id).await?.ok_or_else(|| QueryError::NotFound(id.clone()))?;

        let citations = if include_citations { Some(self.graph.incoming_citations(id).await?) } else { None };
        let references = if include_references { Some(self.graph.outgoing_citations(id).await?) } else { None };

        Ok(PaperDetail {
            id: paper.id.clone().unwrap_or_else(|| id.clone()),
            title: paper.title,
            abstract_text: paper.abstract_text,
            authors: paper.authors,
            categories: paper.categories,
            citation_count: paper.citation_count,
            tl_dr: paper.tl_dr,
            summary: paper.summary,
            citations,
            references,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_papers(&self, page: u32, page_size: u32, category: Option<&str>) -> Result<PaperPage, QueryError> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page as i64 - 1) * page_size as i64;
        let (papers, total) = self.graph.list_papers(offset, page_size as i64, category).await?;
        Ok(PaperPage { items: papers.iter().map(PaperSummary::from).collect(), page, page_size, total })
    }

    /// Embeds `query_text` once through the analysis provider, then returns
    /// the `limit` nearest neighbors by vector similarity (spec §4.6).
    #[instrument(skip(self, query_text))]
    pub async fn semantic_search(
        &self,
        query_text: &str,
        limit: usize,
        filter: Option<&str>,
    ) -> Result<Vec<ScoredPaper>, QueryError> {
        let cancel = CancellationToken::new();
        let query_vector = self.analysis.embed(query_text, &cancel).await?;
        let matches = self.vector.query(&query_vector, limit, filter).await?;

        let mut hits = Vec::with_capacity(matches.len());
        for m in matches {
            let summary = match self.graph.get_paper(&m.id).await? {
                Some(p) => PaperSummary::from(&p),
                None => PaperSummary { id: m.id, title: m.title, categories: vec![], citation_count: None },
            };
            hits.push(ScoredPaper { paper: summary, score: distance_to_similarity(m.distance) });
        }
        Ok(hits)
    }

    /// Re-scores the top `3*limit` vector matches by a fixed convex
    /// combination of similarity and z-normalized citation influence,
    /// returning the top `limit` (spec §4.6, alpha = 0.7).
    #[instrument(skip(self, query_text))]
    pub async fn hybrid_search(&self, query_text: &str, limit: usize) -> Result<Vec<ScoredPaper>, QueryError> {
        let candidates = self.semantic_search(query_text, limit * HYBRID_CANDIDATE_MULTIPLIER, None).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let counts: Vec<u64> = candidates.iter().map(|c| c.paper.citation_count.unwrap_or(0)).collect();
        let influences = z_normalize_citations(&counts);

        let mut fused: Vec<ScoredPaper> = candidates
            .into_iter()
            .zip(influences)
            .map(|(hit, influence)| ScoredPaper { score: fuse_scores(hit.score, influence, DEFAULT_HYBRID_ALPHA), ..hit })
            .collect();

        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(limit);
        Ok(fused)
    }

    #[instrument(skip(self))]
    pub async fn citation_neighborhood(&self, id: &PaperId, depth: u32) -> Result<CitationNeighborhood, QueryError> {
        let limit = 1000;
        let mut nodes = self.graph.citation_neighborhood(id, depth, limit).await?;
        nodes.insert(0, id.clone());

        let mut edges = Vec::new();
        for node in &nodes {
            for dst in self.graph.outgoing_citations(node).await? {
                if nodes.contains(&dst) {
                    edges.push(NeighborhoodEdge { src: node.clone(), dst });
                }
            }
        }
        Ok(CitationNeighborhood { nodes, edges })
    }

    #[instrument(skip(self))]
    pub async fn clusters(&self, min_size: usize) -> Result<Vec<Cluster>, QueryError> {
        let edges = self.graph.export_edges().await?;
        Ok(connected_components(&edges, min_size))
    }
}

/// LanceDB returns squared L2 distance over normalized embeddings; convert
/// to a `[0, 1]` similarity score for display (spec §4.6 "score in [0,1]").
fn distance_to_similarity(distance: f32) -> f64 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - (distance as f64 / 2.0)).clamp(0.0, 1.0)
}

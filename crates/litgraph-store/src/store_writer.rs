//! Combines the graph and vector stores into the single write surface the
//! pipeline's persist stage calls (spec §4.4, §4.5 Persist stage).
//!
//! Writes happen graph-first, then vector. If the vector write fails after
//! the graph write succeeded, the paper is left "graph-persisted,
//! embedding-missing" (spec §4.4) rather than rolled back — a later
//! analyzer pass picks it up again because it has no stored embedding.

use litgraph_common::entities::{CitationEdge, Concept, MentionsEdge, Paper};
use litgraph_common::{PaperId, Result};
use tracing::{instrument, warn};

use crate::graph_store::GraphStore;
use crate::vector_store::{EmbeddedPaper, VectorStore};

pub struct StoreWriter<G, V> {
    graph: G,
    vector: V,
}

/// What happened when persisting one paper's enrichment output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Both the graph and (if an embedding was supplied) vector write succeeded.
    Complete,
    /// The graph write succeeded but no embedding was supplied, so there was
    /// nothing to write to the vector store.
    GraphOnlyNoEmbedding,
    /// The graph write succeeded but the vector write failed; the paper is
    /// graph-persisted with a missing embedding.
    GraphPersistedEmbeddingMissing,
}

impl<G, V> StoreWriter<G, V>
where
    G: GraphStore,
    V: VectorStore,
{
    pub fn new(graph: G, vector: V) -> Self {
        Self { graph, vector }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn vector(&self) -> &V {
        &self.vector
    }

    #[instrument(skip(self, paper, citations, concepts, mentions, embedding), fields(paper_id = paper.id.as_ref().map(|i| i.as_str())))]
    pub async fn persist_paper(
        &self,
        paper: &Paper,
        citations: &[CitationEdge],
        concepts: &[Concept],
        mentions: &[MentionsEdge],
        embedding: Option<(Vec<f32>, String)>,
    ) -> Result<PersistOutcome> {
        self.graph.upsert_paper(paper).await?;

        for edge in citations {
            self.graph.upsert_citation_edge(edge).await?;
        }
        for concept in concepts {
            self.graph.upsert_concept(concept).await?;
        }
        for mention in mentions {
            self.graph.upsert_mention(mention).await?;
        }

        let Some((vector, embedding_model_id)) = embedding else {
            return Ok(PersistOutcome::GraphOnlyNoEmbedding);
        };

        let id = match &paper.id {
            Some(id) => id.clone(),
            None => return Ok(PersistOutcome::GraphOnlyNoEmbedding),
        };

        let embedded = EmbeddedPaper {
            id: id.clone(),
            title: paper.title.clone(),
            categories: paper.categories.clone(),
            citation_count: paper.citation_count,
            embedding_model_id,
            embedding: vector,
        };

        match self.vector.upsert(&embedded).await {
            Ok(()) => Ok(PersistOutcome::Complete),
            Err(e) => {
                warn!(paper_id = id.as_str(), error = %e, "vector write failed, paper left graph-persisted");
                Ok(PersistOutcome::GraphPersistedEmbeddingMissing)
            }
        }
    }

    /// Whether `id`'s stored embedding (if any) was produced by a different
    /// model than `expected_model_id` and should be regenerated (spec §9
    /// Open Question, resolved: re-embed on model-id mismatch).
    pub async fn needs_reembed(&self, id: &PaperId, expected_model_id: &str) -> Result<bool> {
        match self.vector.embedding_model_id(id).await? {
            Some(stored) => Ok(stored != expected_model_id),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litgraph_common::CoreError;
    use std::sync::Mutex;

    struct StubGraphStore {
        papers: Mutex<std::collections::HashMap<PaperId, Paper>>,
    }

    impl StubGraphStore {
        fn new() -> Self {
            Self { papers: Mutex::new(std::collections::HashMap::new()) }
        }
    }

    #[async_trait]
    impl GraphStore for StubGraphStore {
        async fn upsert_paper(&self, paper: &Paper) -> Result<()> {
            let id = paper.id.clone().ok_or_else(|| CoreError::InvalidId("no id".to_string()))?;
            self.papers.lock().unwrap().insert(id, paper.clone());
            Ok(())
        }
        async fn get_paper(&self, id: &PaperId) -> Result<Option<Paper>> {
            Ok(self.papers.lock().unwrap().get(id).cloned())
        }
        async fn upsert_citation_edge(&self, _edge: &CitationEdge) -> Result<()> {
            Ok(())
        }
        async fn upsert_concept(&self, _concept: &Concept) -> Result<()> {
            Ok(())
        }
        async fn upsert_mention(&self, _mention: &MentionsEdge) -> Result<()> {
            Ok(())
        }
        async fn citation_neighborhood(&self, _id: &PaperId, _depth: u32, _limit: usize) -> Result<Vec<PaperId>> {
            Ok(vec![])
        }
        async fn export_edges(&self) -> Result<Vec<(PaperId, PaperId)>> {
            Ok(vec![])
        }
        async fn list_papers(&self, _offset: i64, _limit: i64, _category: Option<&str>) -> Result<(Vec<Paper>, i64)> {
            Ok((vec![], 0))
        }
        async fn outgoing_citations(&self, _id: &PaperId) -> Result<Vec<PaperId>> {
            Ok(vec![])
        }
        async fn incoming_citations(&self, _id: &PaperId) -> Result<Vec<PaperId>> {
            Ok(vec![])
        }
    }

    struct StubVectorStore {
        fail: bool,
        stored: Mutex<std::collections::HashMap<PaperId, EmbeddedPaper>>,
    }

    impl StubVectorStore {
        fn new(fail: bool) -> Self {
            Self { fail, stored: Mutex::new(std::collections::HashMap::new()) }
        }
    }

    #[async_trait]
    impl VectorStore for StubVectorStore {
        async fn upsert(&self, paper: &EmbeddedPaper) -> Result<()> {
            if self.fail {
                return Err(CoreError::StoreBusy);
            }
            self.stored.lock().unwrap().insert(paper.id.clone(), paper.clone());
            Ok(())
        }
        async fn embedding_model_id(&self, id: &PaperId) -> Result<Option<String>> {
            Ok(self.stored.lock().unwrap().get(id).map(|p| p.embedding_model_id.clone()))
        }
        async fn query(&self, _query: &[f32], _k: usize, _filter: Option<&str>) -> Result<Vec<VectorMatch>> {
            Ok(vec![])
        }
    }

    fn paper(id: &str) -> Paper {
        Paper { id: Some(PaperId::new(id)), title: "T".to_string(), ..Default::default() }
    }

    #[tokio::test]
    async fn persist_without_embedding_is_graph_only() {
        let writer = StoreWriter::new(StubGraphStore::new(), StubVectorStore::new(false));
        let outcome = writer.persist_paper(&paper("a"), &[], &[], &[], None).await.unwrap();
        assert_eq!(outcome, PersistOutcome::GraphOnlyNoEmbedding);
    }

    #[tokio::test]
    async fn persist_with_embedding_is_complete() {
        let writer = StoreWriter::new(StubGraphStore::new(), StubVectorStore::new(false));
        let outcome = writer
            .persist_paper(&paper("a"), &[], &[], &[], Some((vec![0.1, 0.2], "model-v1".to_string())))
            .await
            .unwrap();
        assert_eq!(outcome, PersistOutcome::Complete);
    }

    #[tokio::test]
    async fn vector_write_failure_leaves_graph_persisted() {
        let writer = StoreWriter::new(StubGraphStore::new(), StubVectorStore::new(true));
        let outcome = writer
            .persist_paper(&paper("a"), &[], &[], &[], Some((vec![0.1, 0.2], "model-v1".to_string())))
            .await
            .unwrap();
        assert_eq!(outcome, PersistOutcome::GraphPersistedEmbeddingMissing);

        let stored = writer.graph().get_paper(&PaperId::new("a")).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn needs_reembed_is_true_when_never_embedded() {
        let writer = StoreWriter::new(StubGraphStore::new(), StubVectorStore::new(false));
        assert!(writer.needs_reembed(&PaperId::new("a"), "model-v1").await.unwrap());
    }

    #[tokio::test]
    async fn needs_reembed_is_false_when_model_matches() {
        let writer = StoreWriter::new(StubGraphStore::new(), StubVectorStore::new(false));
        writer
            .persist_paper(&paper("a"), &[], &[], &[], Some((vec![0.1, 0.2], "model-v1".to_string())))
            .await
            .unwrap();
        assert!(!writer.needs_reembed(&PaperId::new("a"), "model-v1").await.unwrap());
        assert!(writer.needs_reembed(&PaperId::new("a"), "model-v2").await.unwrap());
    }
}

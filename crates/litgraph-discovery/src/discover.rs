//! Drives one discovery step: pop the next frontier item, fetch its
//! citations/references via a `MetadataProvider`, and enqueue its neighbors
//! (spec §4.2 discover-stage contract, §4.5 Discover→Fetch handoff).

use litgraph_common::PaperId;
use litgraph_providers::model::Cursor;
use litgraph_providers::{MetadataProvider, ProviderError};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::frontier::{Frontier, FrontierItem};

/// The outcome of discovering one paper's neighbors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub item: FrontierItem,
    pub neighbors_found: usize,
    pub neighbors_enqueued: usize,
}

/// Process one item popped from the frontier: walk all pages of its
/// citations and references, and enqueue whichever neighbors survive the
/// frontier's bounds and dedup. Returns `Ok(None)` when the frontier has
/// no pending work right now.
#[instrument(skip(frontier, provider, cancel))]
pub async fn discover_next(
    frontier: &Frontier,
    provider: &dyn MetadataProvider,
    cancel: &CancellationToken,
) -> Result<Option<DiscoveryOutcome>, ProviderError> {
    let Some(item) = frontier.next() else {
        return Ok(None);
    };

    let mut neighbors: Vec<PaperId> = Vec::new();
    for edge_fetch in [EdgeDirection::Citations, EdgeDirection::References] {
        let mut cursor = Cursor(None);
        loop {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            let page = match edge_fetch {
                EdgeDirection::Citations => provider.get_citations(&item.id, cursor.clone(), cancel).await,
                EdgeDirection::References => provider.get_references(&item.id, cursor.clone(), cancel).await,
            };
            let page = match page {
                Ok(page) => page,
                Err(ProviderError::NotFound) => break,
                Err(e) => {
                    warn!(id = item.id.as_str(), error = %e, "failed to fetch paper edges");
                    return Err(e);
                }
            };
            neighbors.extend(page.items.into_iter().map(|r| r.other_id));
            if page.next.0.is_none() {
                break;
            }
            cursor = page.next;
        }
    }

    let neighbors_found = neighbors.len();
    let neighbors_enqueued = frontier.enqueue_neighbors(item.depth, neighbors);

    Ok(Some(DiscoveryOutcome { item, neighbors_found, neighbors_enqueued }))
}

#[derive(Clone, Copy)]
enum EdgeDirection {
    Citations,
    References,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::FrontierLimits;
    use litgraph_providers::model::{CitationRef, PaperRecord};
    use litgraph_providers::testing::StubMetadataProvider;

    fn paper(id: &str) -> PaperRecord {
        PaperRecord {
            id: PaperId::new(id),
            title: id.to_string(),
            abstract_text: None,
            authors: vec![],
            categories: vec![],
            published_date: None,
            citation_count: None,
        }
    }

    #[tokio::test]
    async fn discovers_and_enqueues_neighbors() {
        let provider = StubMetadataProvider::new()
            .with_paper(paper("a"))
            .with_citations(PaperId::new("a"), vec![CitationRef { other_id: PaperId::new("b"), context: None }])
            .with_references(PaperId::new("a"), vec![CitationRef { other_id: PaperId::new("c"), context: None }]);

        let frontier = Frontier::new(FrontierLimits::default());
        frontier.seed([PaperId::new("a")]);
        let cancel = CancellationToken::new();

        let outcome = discover_next(&frontier, &provider, &cancel).await.unwrap().unwrap();
        assert_eq!(outcome.item.id, PaperId::new("a"));
        assert_eq!(outcome.neighbors_found, 2);
        assert_eq!(outcome.neighbors_enqueued, 2);
        assert_eq!(frontier.pending_count(), 2);
    }

    #[tokio::test]
    async fn empty_frontier_yields_none() {
        let provider = StubMetadataProvider::new();
        let frontier = Frontier::new(FrontierLimits::default());
        let cancel = CancellationToken::new();
        assert!(discover_next(&frontier, &provider, &cancel).await.unwrap().is_none());
    }
}

//! litgraph-query — the read facade (C6): query operations over the
//! completed store (get paper, list, semantic/hybrid search, citation
//! neighborhoods, clusters). Read-only and safe to call concurrently with
//! an active pipeline run.

pub mod clustering;
pub mod error;
pub mod facade;
pub mod types;

pub use error::QueryError;
pub use facade::QueryFacade;
pub use types::{
    CitationNeighborhood, Cluster, NeighborhoodEdge, PaperDetail, PaperPage, PaperSummary, ScoredPaper,
};

use litgraph_common::{CoreError, PaperId};
use litgraph_providers::ProviderError;
use thiserror::Error;

/// Errors surfaced by the read facade (spec §4.6).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("paper not found: {0}")]
    NotFound(PaperId),

    #[error(transparent)]
    Store(#[from] CoreError),

    #[error("embedding provider error: {0}")]
    Embedding(#[from] ProviderError),
}

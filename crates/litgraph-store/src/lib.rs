//! litgraph-store — persistence (C4): a Postgres-backed graph store for
//! papers/concepts/citations/mentions, an embedded LanceDB vector store for
//! embeddings, and a combined writer used by the pipeline's persist stage.

pub mod graph_store;
pub mod store_writer;
pub mod vector_store;

pub use graph_store::{GraphStore, PgGraphStore};
pub use store_writer::{PersistOutcome, StoreWriter};
pub use vector_store::{EmbeddedPaper, LanceVectorStore, VectorMatch, VectorStore};

//! litgraph-analyzer — per-paper enrichment (C3): summarization, concept
//! extraction, citation-intent classification, and embedding.

pub mod analyzer;
pub mod extractor;
pub mod record;

pub use analyzer::{Analyzer, CacheFreshness, CitationContext};
pub use extractor::{AbstractOnlyExtractor, ContentExtractor};
pub use record::{AnalysisErrors, EdgeLabel, EnrichmentRecord};

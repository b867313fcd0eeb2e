//! The pluggable content-extraction seam (spec supplement). Full-text PDF/
//! HTML parsing is out of scope for this crate, but the analyzer is built
//! against a trait so a richer extractor can be substituted without
//! touching the enrichment pipeline.

use litgraph_providers::model::PaperRecord;

/// Produces the text a paper should be analyzed from. Implementations may
/// look beyond the abstract (full text, figure captions, etc.); the default
/// implementation here sticks to what metadata providers already return.
pub trait ContentExtractor: Send + Sync {
    /// Best-effort text to feed to summarization/entity-extraction/embedding.
    /// Returns `None` if no usable text exists for this paper.
    fn extract_text(&self, paper: &PaperRecord) -> Option<String>;
}

/// Uses only the paper's abstract, as returned by the metadata provider.
pub struct AbstractOnlyExtractor;

impl ContentExtractor for AbstractOnlyExtractor {
    fn extract_text(&self, paper: &PaperRecord) -> Option<String> {
        paper.abstract_text.clone().filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use litgraph_common::PaperId;

    fn paper(abstract_text: Option<&str>) -> PaperRecord {
        PaperRecord {
            id: PaperId::new("p1"),
            title: "Title".to_string(),
            abstract_text: abstract_text.map(String::from),
            authors: vec![],
            categories: vec![],
            published_date: None::<NaiveDate>,
            citation_count: None,
        }
    }

    #[test]
    fn extracts_nonempty_abstract() {
        let extractor = AbstractOnlyExtractor;
        assert_eq!(extractor.extract_text(&paper(Some("hello"))), Some("hello".to_string()));
    }

    #[test]
    fn blank_abstract_yields_none() {
        let extractor = AbstractOnlyExtractor;
        assert_eq!(extractor.extract_text(&paper(Some("   "))), None);
    }

    #[test]
    fn missing_abstract_yields_none() {
        let extractor = AbstractOnlyExtractor;
        assert_eq!(extractor.extract_text(&paper(None)), None);
    }
}

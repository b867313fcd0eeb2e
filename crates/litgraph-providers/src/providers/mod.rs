pub mod arxiv;
pub mod llm;

pub use arxiv::ArxivProvider;
pub use llm::LlmAnalysisProvider;

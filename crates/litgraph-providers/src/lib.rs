//! litgraph-providers — rate-limited, retrying clients for external
//! metadata and analysis providers (C1: Rate-Limited Client).

pub mod client;
pub mod error;
pub mod model;
pub mod providers;
pub mod rate_limit;
pub mod retry;
pub mod select;
pub mod testing;
pub mod traits;

pub use client::ProviderClient;
pub use error::ProviderError;
pub use retry::{NoopRetryObserver, RetryObserver};
pub use select::FallbackAnalysisProvider;
pub use traits::{AnalysisProvider, MetadataProvider};

//! Typed errors for the rate-limited client (spec §4.1 error conditions table).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("paper not found")]
    NotFound,

    #[error("rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider unavailable")]
    Unavailable,

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("provider overloaded")]
    Overloaded,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether this error kind is worth retrying (spec §4.1 retry policy).
    /// NotFound / InvalidId / InvalidInput are semantic failures and never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Unavailable
                | ProviderError::Overloaded
                | ProviderError::Network(_)
        )
    }

    /// Observability tag for the retry counter (spec §4.1: "tagged by provider and error kind").
    pub fn kind_tag(&self) -> &'static str {
        match self {
            ProviderError::NotFound => "not_found",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Unavailable => "unavailable",
            ProviderError::InvalidId(_) => "invalid_id",
            ProviderError::Overloaded => "overloaded",
            ProviderError::InvalidInput(_) => "invalid_input",
            ProviderError::Network(_) => "network",
            ProviderError::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            ProviderError::Network(e.to_string())
        } else {
            ProviderError::Unavailable
        }
    }
}

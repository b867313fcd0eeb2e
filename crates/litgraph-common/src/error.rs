use thiserror::Error;

/// Error taxonomy shared by every core component (spec §7).
///
/// Transient/Permanent/Partial classification lives on the variant itself so
/// callers can match on kind rather than parse a message.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("paper not found: {0}")]
    NotFound(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("store is busy, retry later")]
    StoreBusy,

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    /// Whether a retry is ever sensible for this error kind (spec §7 propagation policy).
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Database(_) | CoreError::Http(_) | CoreError::StoreBusy)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

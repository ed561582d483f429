use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by state-store adapters. Backend-specific connectivity
/// failures are normalized here so callers never branch on backend
/// identity.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("State store unreachable: {0}")]
    Connect(String),

    #[error("Write conflict on key: {0}")]
    Conflict(String),

    #[error("State store error: {0}")]
    Backend(String),

    #[error("Unsupported state store {kind:?} (supported: {supported})")]
    UnsupportedBackend { kind: String, supported: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Map a reqwest transport error onto the normalized taxonomy.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            StoreError::Connect(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

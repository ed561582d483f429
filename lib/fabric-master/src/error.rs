use fabric_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MasterError>;

#[derive(Error, Debug)]
pub enum MasterError {
    #[error("Network not found: {0}")]
    NetworkNotFound(String),

    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! The uniform state-store contract

use crate::{Result, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Uniform CRUD + enumerate interface over a distributed key-value
/// backend. One handle is built at startup and shared by every request;
/// re-selecting the backend requires a restart.
///
/// Implementations map these operations onto their native protocol and
/// normalize connectivity failures into `StoreError::Connect` /
/// `StoreError::Backend`.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync + std::fmt::Debug {
    /// Backend kind key, for logging
    fn backend(&self) -> &'static str;

    /// Read the value at `key`. Missing key is `StoreError::NotFound`.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Read every value under `prefix`. A missing prefix is an empty
    /// sequence, not an error.
    async fn read_all(&self, prefix: &str) -> Result<Vec<Vec<u8>>>;

    /// Write `value` at `key`, creating or replacing it.
    async fn write(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete the value at `key`. A missing key is `StoreError::NotFound`;
    /// callers that want idempotent deletion ignore that case.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Read and decode a JSON value from the store.
pub async fn read_json<T: DeserializeOwned>(store: &dyn StateStore, key: &str) -> Result<T> {
    let raw = store.read(key).await?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Encode and write a JSON value to the store.
pub async fn write_json<T: Serialize>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_vec(value)?;
    store.write(key, &raw).await
}

/// Delete `key`, treating a missing key as success.
pub async fn delete_existing(store: &dyn StateStore, key: &str) -> Result<()> {
    match store.delete(key).await {
        Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

//! consul backend: session/TTL store, KV HTTP API

use crate::{Result, StateStore, StoreError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Default agent URL when none is configured
pub const DEFAULT_URL: &str = "http://127.0.0.1:8500";

/// State store backed by a consul cluster, speaking the KV API.
#[derive(Debug)]
pub struct ConsulStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct KvPair {
    #[serde(rename = "Value")]
    value: Option<String>,
}

impl ConsulStore {
    /// Connect to the agent and verify the cluster has a leader. A probe
    /// failure is fatal to daemon startup; there is no retry.
    pub async fn connect(url: Option<&str>) -> Result<Self> {
        let base_url = url.unwrap_or(DEFAULT_URL).trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(StoreError::from_transport)?;

        let leader = client
            .get(format!("{base_url}/v1/status/leader"))
            .send()
            .await
            .map_err(StoreError::from_transport)?
            .text()
            .await
            .map_err(StoreError::from_transport)?;
        info!("Connected to consul at {}, leader {}", base_url, leader.trim());

        Ok(Self { client, base_url })
    }

    // Consul keys carry no leading slash; ours always start with one.
    fn kv_url(&self, key: &str) -> String {
        format!("{}/v1/kv{}", self.base_url, key)
    }

    fn decode_pairs(pairs: Vec<KvPair>) -> Result<Vec<Vec<u8>>> {
        pairs
            .into_iter()
            .filter_map(|p| p.value)
            .map(|v| {
                BASE64
                    .decode(v)
                    .map_err(|e| StoreError::Backend(format!("bad KV encoding: {e}")))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl StateStore for ConsulStore {
    fn backend(&self) -> &'static str {
        "consul"
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(self.kv_url(key))
            .send()
            .await
            .map_err(StoreError::from_transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let resp = resp.error_for_status().map_err(StoreError::from_transport)?;
        let pairs: Vec<KvPair> = resp.json().await.map_err(StoreError::from_transport)?;
        Self::decode_pairs(pairs)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn read_all(&self, prefix: &str) -> Result<Vec<Vec<u8>>> {
        let resp = self
            .client
            .get(self.kv_url(prefix))
            .query(&[("recurse", "true")])
            .send()
            .await
            .map_err(StoreError::from_transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let resp = resp.error_for_status().map_err(StoreError::from_transport)?;
        let pairs: Vec<KvPair> = resp.json().await.map_err(StoreError::from_transport)?;
        let values = Self::decode_pairs(pairs)?;
        debug!("consul read_all {}: {} values", prefix, values.len());
        Ok(values)
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        let resp = self
            .client
            .put(self.kv_url(key))
            .body(value.to_vec())
            .send()
            .await
            .map_err(StoreError::from_transport)?;
        if resp.status() == StatusCode::CONFLICT {
            return Err(StoreError::Conflict(key.to_string()));
        }
        resp.error_for_status().map_err(StoreError::from_transport)?;
        debug!("consul write {}", key);
        Ok(())
    }

    // Consul deletes are idempotent at the wire level; surface NotFound
    // ourselves so the contract matches the other backends.
    async fn delete(&self, key: &str) -> Result<()> {
        self.read(key).await?;
        let resp = self
            .client
            .delete(self.kv_url(key))
            .send()
            .await
            .map_err(StoreError::from_transport)?;
        resp.error_for_status().map_err(StoreError::from_transport)?;
        debug!("consul delete {}", key);
        Ok(())
    }
}

//! etcd backend: strongly consistent quorum store, v2 keys API

use crate::{Result, StateStore, StoreError};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Default cluster URL when none is configured
pub const DEFAULT_URL: &str = "http://127.0.0.1:4001";

/// State store backed by an etcd cluster, speaking the v2 keys API.
#[derive(Debug)]
pub struct EtcdStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct KeysResponse {
    node: Option<Node>,
}

#[derive(Deserialize)]
struct Node {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    dir: bool,
    #[serde(default)]
    nodes: Vec<Node>,
}

impl EtcdStore {
    /// Connect to the cluster and verify it is reachable. A probe failure
    /// is fatal to daemon startup; there is no retry.
    pub async fn connect(url: Option<&str>) -> Result<Self> {
        let base_url = url.unwrap_or(DEFAULT_URL).trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(StoreError::from_transport)?;

        let version = client
            .get(format!("{base_url}/version"))
            .send()
            .await
            .map_err(StoreError::from_transport)?
            .text()
            .await
            .map_err(StoreError::from_transport)?;
        info!("Connected to etcd at {}: {}", base_url, version.trim());

        Ok(Self { client, base_url })
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/v2/keys{}", self.base_url, key)
    }

    fn collect_leaves(node: Node, out: &mut Vec<Vec<u8>>) {
        if node.dir {
            for child in node.nodes {
                Self::collect_leaves(child, out);
            }
        } else if let Some(value) = node.value {
            out.push(value.into_bytes());
        }
    }
}

#[async_trait::async_trait]
impl StateStore for EtcdStore {
    fn backend(&self) -> &'static str {
        "etcd"
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(self.key_url(key))
            .send()
            .await
            .map_err(StoreError::from_transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let resp = resp.error_for_status().map_err(StoreError::from_transport)?;
        let body: KeysResponse = resp.json().await.map_err(StoreError::from_transport)?;
        body.node
            .and_then(|n| n.value)
            .map(String::into_bytes)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn read_all(&self, prefix: &str) -> Result<Vec<Vec<u8>>> {
        let resp = self
            .client
            .get(self.key_url(prefix.trim_end_matches('/')))
            .query(&[("recursive", "true")])
            .send()
            .await
            .map_err(StoreError::from_transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let resp = resp.error_for_status().map_err(StoreError::from_transport)?;
        let body: KeysResponse = resp.json().await.map_err(StoreError::from_transport)?;

        let mut values = Vec::new();
        if let Some(node) = body.node {
            Self::collect_leaves(node, &mut values);
        }
        debug!("etcd read_all {}: {} values", prefix, values.len());
        Ok(values)
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        let value = std::str::from_utf8(value)
            .map_err(|e| StoreError::Backend(format!("non-utf8 value for {key}: {e}")))?;
        let resp = self
            .client
            .put(self.key_url(key))
            .form(&[("value", value)])
            .send()
            .await
            .map_err(StoreError::from_transport)?;
        if resp.status() == StatusCode::PRECONDITION_FAILED
            || resp.status() == StatusCode::CONFLICT
        {
            return Err(StoreError::Conflict(key.to_string()));
        }
        resp.error_for_status().map_err(StoreError::from_transport)?;
        debug!("etcd write {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.key_url(key))
            .send()
            .await
            .map_err(StoreError::from_transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(key.to_string()));
        }
        resp.error_for_status().map_err(StoreError::from_transport)?;
        debug!("etcd delete {}", key);
        Ok(())
    }
}

//! Network driver: materializes operational state in the store
//!
//! The reconciler decides *what* changes; this driver owns *how* a
//! network or endpoint becomes a stored record, including packet-tag
//! allocation and referential checks.

use crate::{MasterError, ResourceManager, Result};
use fabric_api::state::{ENDPOINT_PREFIX, NETWORK_PREFIX};
use fabric_api::{
    endpoint_key, network_key, EndpointConfig, EndpointState, HostBinding, NetworkConfig,
    NetworkState,
};
use fabric_store::{delete_existing, read_json, write_json, StateStore, StoreError};
use std::sync::Arc;
use tracing::debug;

pub struct NetworkDriver {
    store: Arc<dyn StateStore>,
    resources: Arc<ResourceManager>,
}

impl NetworkDriver {
    pub fn new(store: Arc<dyn StateStore>, resources: Arc<ResourceManager>) -> Self {
        Self { store, resources }
    }

    async fn read_network(&self, id: &str) -> Result<Option<NetworkState>> {
        match read_json(self.store.as_ref(), &network_key(id)).await {
            Ok(nw) => Ok(Some(nw)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create or update a network. An existing allocated tag is kept
    /// across re-declarations unless the intent pins a different one.
    pub async fn create_network(&self, cfg: &NetworkConfig) -> Result<()> {
        let existing = self.read_network(&cfg.name).await?;

        let (pkt_tag, pkt_tag_allocated) = match (cfg.pkt_tag, &existing) {
            (Some(tag), _) => (tag, false),
            (None, Some(prev)) if prev.pkt_tag_allocated => (prev.pkt_tag, true),
            (None, _) => (self.resources.allocate_pkt_tag().await?, true),
        };

        // A previously pool-held tag goes back when the intent now pins one.
        if let Some(prev) = &existing {
            if prev.pkt_tag_allocated && (!pkt_tag_allocated || prev.pkt_tag != pkt_tag) {
                self.resources.release_pkt_tag(prev.pkt_tag).await?;
            }
        }

        let nw = NetworkState {
            id: cfg.name.clone(),
            pkt_tag_type: cfg.pkt_tag_type.clone(),
            pkt_tag,
            pkt_tag_allocated,
            subnet: cfg.subnet.clone(),
        };
        write_json(self.store.as_ref(), &network_key(&nw.id), &nw).await?;
        debug!("Created network: {} (tag {})", nw.id, nw.pkt_tag);
        Ok(())
    }

    /// Delete a network. Absent networks are ignored; networks with live
    /// endpoints are refused.
    pub async fn delete_network(&self, id: &str) -> Result<()> {
        let Some(nw) = self.read_network(id).await? else {
            return Ok(());
        };

        let attached = self
            .endpoints()
            .await?
            .into_iter()
            .filter(|ep| ep.network == id)
            .count();
        if attached > 0 {
            return Err(MasterError::InvalidConfiguration(format!(
                "network {id} still has {attached} endpoint(s)"
            )));
        }

        if nw.pkt_tag_allocated {
            self.resources.release_pkt_tag(nw.pkt_tag).await?;
        }
        delete_existing(self.store.as_ref(), &network_key(id)).await?;
        debug!("Deleted network: {}", id);
        Ok(())
    }

    /// Create or update an endpoint. Its network must already exist.
    pub async fn create_endpoint(&self, cfg: &EndpointConfig) -> Result<()> {
        if self.read_network(&cfg.network).await?.is_none() {
            return Err(MasterError::NetworkNotFound(cfg.network.clone()));
        }

        let ep = EndpointState {
            id: cfg.id(),
            name: cfg.name.clone(),
            network: cfg.network.clone(),
            host: cfg.host.clone(),
            ip_address: cfg.ip_address.clone(),
        };
        write_json(self.store.as_ref(), &endpoint_key(&ep.id), &ep).await?;
        debug!("Created endpoint: {}", ep.id);
        Ok(())
    }

    /// Delete an endpoint; absent endpoints are ignored.
    pub async fn delete_endpoint(&self, id: &str) -> Result<()> {
        delete_existing(self.store.as_ref(), &endpoint_key(id)).await?;
        debug!("Deleted endpoint: {}", id);
        Ok(())
    }

    /// Bind an existing endpoint to a host.
    pub async fn bind_endpoint(&self, binding: &HostBinding) -> Result<()> {
        let mut ep: EndpointState =
            match read_json(self.store.as_ref(), &endpoint_key(&binding.endpoint)).await {
                Ok(ep) => ep,
                Err(StoreError::NotFound(_)) => {
                    return Err(MasterError::EndpointNotFound(binding.endpoint.clone()))
                }
                Err(e) => return Err(e.into()),
            };
        ep.host = Some(binding.host.clone());
        write_json(self.store.as_ref(), &endpoint_key(&ep.id), &ep).await?;
        debug!("Bound endpoint {} to host {}", ep.id, binding.host);
        Ok(())
    }

    /// Every stored network.
    pub async fn networks(&self) -> Result<Vec<NetworkState>> {
        let raws = self.store.read_all(NETWORK_PREFIX).await?;
        raws.iter()
            .map(|raw| serde_json::from_slice(raw).map_err(MasterError::from))
            .collect()
    }

    /// Every stored endpoint.
    pub async fn endpoints(&self) -> Result<Vec<EndpointState>> {
        let raws = self.store.read_all(ENDPOINT_PREFIX).await?;
        raws.iter()
            .map(|raw| serde_json::from_slice(raw).map_err(MasterError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_store::MemStore;

    async fn driver() -> NetworkDriver {
        let store: Arc<dyn StateStore> = Arc::new(MemStore::new());
        let resources = Arc::new(ResourceManager::init(store.clone()).await.unwrap());
        NetworkDriver::new(store, resources)
    }

    fn net(name: &str) -> NetworkConfig {
        NetworkConfig {
            name: name.to_string(),
            pkt_tag_type: "vlan".to_string(),
            ..Default::default()
        }
    }

    fn ep(name: &str, network: &str) -> EndpointConfig {
        EndpointConfig {
            name: name.to_string(),
            network: network.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn network_gets_a_pool_tag_when_none_pinned() {
        let driver = driver().await;
        driver.create_network(&net("net1")).await.unwrap();

        let nets = driver.networks().await.unwrap();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].pkt_tag, 1);
        assert!(nets[0].pkt_tag_allocated);
    }

    #[tokio::test]
    async fn pinned_tag_is_honored() {
        let driver = driver().await;
        let mut cfg = net("net1");
        cfg.pkt_tag = Some(42);
        driver.create_network(&cfg).await.unwrap();

        let nets = driver.networks().await.unwrap();
        assert_eq!(nets[0].pkt_tag, 42);
        assert!(!nets[0].pkt_tag_allocated);
    }

    #[tokio::test]
    async fn redeclaration_keeps_the_allocated_tag() {
        let driver = driver().await;
        driver.create_network(&net("net1")).await.unwrap();
        driver.create_network(&net("net1")).await.unwrap();

        let nets = driver.networks().await.unwrap();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].pkt_tag, 1);
    }

    #[tokio::test]
    async fn delete_releases_the_tag_for_reuse() {
        let driver = driver().await;
        driver.create_network(&net("net1")).await.unwrap();
        driver.delete_network("net1").await.unwrap();
        driver.create_network(&net("net2")).await.unwrap();

        let nets = driver.networks().await.unwrap();
        assert_eq!(nets[0].pkt_tag, 1);
    }

    #[tokio::test]
    async fn endpoint_requires_its_network() {
        let driver = driver().await;
        let err = driver.create_endpoint(&ep("web1", "ghost")).await.unwrap_err();
        assert!(matches!(err, MasterError::NetworkNotFound(_)));
    }

    #[tokio::test]
    async fn network_with_endpoints_refuses_deletion() {
        let driver = driver().await;
        driver.create_network(&net("net1")).await.unwrap();
        driver.create_endpoint(&ep("web1", "net1")).await.unwrap();

        let err = driver.delete_network("net1").await.unwrap_err();
        assert!(matches!(err, MasterError::InvalidConfiguration(_)));

        driver.delete_endpoint("net1-web1").await.unwrap();
        driver.delete_network("net1").await.unwrap();
    }

    #[tokio::test]
    async fn binding_updates_the_stored_endpoint() {
        let driver = driver().await;
        driver.create_network(&net("net1")).await.unwrap();
        driver.create_endpoint(&ep("web1", "net1")).await.unwrap();

        driver
            .bind_endpoint(&HostBinding {
                endpoint: "net1-web1".to_string(),
                host: "host-a".to_string(),
            })
            .await
            .unwrap();

        let eps = driver.endpoints().await.unwrap();
        assert_eq!(eps[0].host.as_deref(), Some("host-a"));
    }

    #[tokio::test]
    async fn binding_unknown_endpoint_is_an_error() {
        let driver = driver().await;
        let err = driver
            .bind_endpoint(&HostBinding {
                endpoint: "net1-ghost".to_string(),
                host: "host-a".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MasterError::EndpointNotFound(_)));
    }
}

//! Intent reconciliation: delete-then-add convergence
//!
//! `apply_desired` never computes a structural diff. It removes everything
//! the intent no longer declares, then upserts everything it does. The
//! ordering is mandatory: adding before deleting would transiently destroy
//! objects the new intent also wants.
//!
//! There is no in-process lock around the sequence; two concurrent calls
//! over overlapping intents may interleave, bounded only by the backend
//! store's own consistency. A failed sub-step aborts the operation with no
//! rollback of sub-steps already applied.

use crate::{NetworkDriver, Result};
use fabric_api::{Config, HostBinding};
use std::collections::HashSet;
use tracing::{debug, info};

pub struct Reconciler {
    driver: NetworkDriver,
}

impl Reconciler {
    pub fn new(driver: NetworkDriver) -> Self {
        Self { driver }
    }

    /// Converge stored state to exactly `cfg`: full delete pass over
    /// objects the intent dropped, then full add pass.
    pub async fn apply_desired(&self, cfg: &Config) -> Result<()> {
        self.delete_delta(cfg).await?;
        self.process_additions(cfg).await
    }

    /// Additions only, for intents known to be purely incremental.
    pub async fn apply_additions(&self, cfg: &Config) -> Result<()> {
        self.process_additions(cfg).await
    }

    /// Deletions only. Deleting objects that are already gone is a no-op.
    pub async fn apply_deletions(&self, cfg: &Config) -> Result<()> {
        info!(
            "Deleting {} endpoint(s), {} network(s)",
            cfg.endpoints.len(),
            cfg.networks.len()
        );
        for ep in &cfg.endpoints {
            self.driver.delete_endpoint(&ep.id()).await?;
        }
        for nw in &cfg.networks {
            self.driver.delete_network(&nw.name).await?;
        }
        Ok(())
    }

    /// Bind endpoints to hosts. Outside the delete/add cycle: bindings
    /// mutate existing endpoints and never create or destroy objects.
    pub async fn apply_host_bindings(&self, bindings: &[HostBinding]) -> Result<()> {
        info!("Applying {} host binding(s)", bindings.len());
        for binding in bindings {
            self.driver.bind_endpoint(binding).await?;
        }
        Ok(())
    }

    // Remove every stored object absent from the intent. Endpoints go
    // first so their networks become deletable within the same pass.
    async fn delete_delta(&self, cfg: &Config) -> Result<()> {
        let desired_networks: HashSet<&str> =
            cfg.networks.iter().map(|n| n.name.as_str()).collect();
        let desired_endpoints: HashSet<String> =
            cfg.endpoints.iter().map(|e| e.id()).collect();

        for ep in self.driver.endpoints().await? {
            if !desired_endpoints.contains(&ep.id) {
                debug!("Delete delta: endpoint {}", ep.id);
                self.driver.delete_endpoint(&ep.id).await?;
            }
        }
        for nw in self.driver.networks().await? {
            if !desired_networks.contains(nw.id.as_str()) {
                debug!("Delete delta: network {}", nw.id);
                self.driver.delete_network(&nw.id).await?;
            }
        }
        Ok(())
    }

    // Upsert everything the intent declares, networks before the
    // endpoints that attach to them.
    async fn process_additions(&self, cfg: &Config) -> Result<()> {
        info!(
            "Processing additions: {} network(s), {} endpoint(s)",
            cfg.networks.len(),
            cfg.endpoints.len()
        );
        for nw in &cfg.networks {
            self.driver.create_network(nw).await?;
        }
        for ep in &cfg.endpoints {
            self.driver.create_endpoint(ep).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceManager;
    use fabric_api::{EndpointConfig, NetworkConfig};
    use fabric_store::{MemStore, StateStore};
    use std::sync::Arc;

    async fn reconciler() -> (Reconciler, NetworkDriver) {
        let store: Arc<dyn StateStore> = Arc::new(MemStore::new());
        let resources = Arc::new(ResourceManager::init(store.clone()).await.unwrap());
        (
            Reconciler::new(NetworkDriver::new(store.clone(), resources.clone())),
            NetworkDriver::new(store, resources),
        )
    }

    fn intent(networks: &[&str], endpoints: &[(&str, &str)]) -> Config {
        Config {
            networks: networks
                .iter()
                .map(|n| NetworkConfig {
                    name: n.to_string(),
                    pkt_tag_type: "vlan".to_string(),
                    ..Default::default()
                })
                .collect(),
            endpoints: endpoints
                .iter()
                .map(|(name, network)| EndpointConfig {
                    name: name.to_string(),
                    network: network.to_string(),
                    ..Default::default()
                })
                .collect(),
            host_bindings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn additions_round_trip() {
        let (rec, driver) = reconciler().await;
        rec.apply_additions(&intent(&["net1"], &[("web1", "net1")]))
            .await
            .unwrap();

        assert_eq!(driver.networks().await.unwrap().len(), 1);
        assert_eq!(driver.endpoints().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deletions_are_idempotent() {
        let (rec, driver) = reconciler().await;
        let cfg = intent(&["net1"], &[("web1", "net1")]);
        rec.apply_additions(&cfg).await.unwrap();

        rec.apply_deletions(&cfg).await.unwrap();
        assert!(driver.networks().await.unwrap().is_empty());

        // Repeat on the same intent is a no-op, never an error.
        rec.apply_deletions(&cfg).await.unwrap();
        rec.apply_deletions(&cfg).await.unwrap();
        assert!(driver.networks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn desired_removes_dropped_objects() {
        let (rec, driver) = reconciler().await;
        rec.apply_additions(&intent(
            &["net1", "net2"],
            &[("web1", "net1"), ("web2", "net2")],
        ))
        .await
        .unwrap();

        rec.apply_desired(&intent(&["net1"], &[("web1", "net1")]))
            .await
            .unwrap();

        let nets = driver.networks().await.unwrap();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].id, "net1");
        let eps = driver.endpoints().await.unwrap();
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[0].id, "net1-web1");
    }

    #[tokio::test]
    async fn redeclared_object_converges_to_desired_attributes() {
        let (rec, driver) = reconciler().await;
        rec.apply_additions(&intent(&["net1"], &[]))
            .await
            .unwrap();

        let mut next = intent(&["net1"], &[]);
        next.networks[0].subnet = Some("10.2.0.0/16".to_string());
        rec.apply_desired(&next).await.unwrap();

        let nets = driver.networks().await.unwrap();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].subnet.as_deref(), Some("10.2.0.0/16"));
        // Never passed through a deleted state: the pool tag survived.
        assert_eq!(nets[0].pkt_tag, 1);
    }

    #[tokio::test]
    async fn empty_desired_intent_clears_everything() {
        let (rec, driver) = reconciler().await;
        rec.apply_additions(&intent(&["net1", "net2"], &[("web1", "net1")]))
            .await
            .unwrap();

        rec.apply_desired(&Config::default()).await.unwrap();
        assert!(driver.networks().await.unwrap().is_empty());
        assert!(driver.endpoints().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_error_aborts_without_rollback() {
        let (rec, driver) = reconciler().await;
        // web1's network exists, web2's does not: the second create fails,
        // the first survives.
        let cfg = intent(&["net1"], &[("web1", "net1"), ("web2", "ghost")]);
        assert!(rec.apply_additions(&cfg).await.is_err());

        let eps = driver.endpoints().await.unwrap();
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[0].id, "net1-web1");
    }

    #[tokio::test]
    async fn host_bindings_do_not_touch_the_object_set() {
        let (rec, driver) = reconciler().await;
        rec.apply_additions(&intent(&["net1"], &[("web1", "net1")]))
            .await
            .unwrap();

        rec.apply_host_bindings(&[HostBinding {
            endpoint: "net1-web1".to_string(),
            host: "host-b".to_string(),
        }])
        .await
        .unwrap();

        let eps = driver.endpoints().await.unwrap();
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[0].host.as_deref(), Some("host-b"));
        assert_eq!(driver.networks().await.unwrap().len(), 1);
    }
}

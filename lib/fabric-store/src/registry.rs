//! Backend registry: maps a backend-kind key to a store constructor
//!
//! The daemon resolves its `--state-store` flag through this registry once
//! at startup; an unrecognized kind is an explicit fatal error rather than
//! a silent default.

use crate::{ConsulStore, EtcdStore, Result, StateStore, StoreError};
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Backend-kind key for the etcd quorum store
pub const ETCD_BACKEND: &str = "etcd";
/// Backend-kind key for the consul session store
pub const CONSUL_BACKEND: &str = "consul";

type StoreBuilder = fn(Option<String>) -> BoxFuture<'static, Result<Arc<dyn StateStore>>>;

/// Registry of state-store constructors keyed by backend kind.
pub struct StoreRegistry {
    builders: BTreeMap<&'static str, StoreBuilder>,
}

impl StoreRegistry {
    /// Registry with the built-in backends (etcd, consul) registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            builders: BTreeMap::new(),
        };
        registry.register(ETCD_BACKEND, build_etcd);
        registry.register(CONSUL_BACKEND, build_consul);
        registry
    }

    /// Register a constructor for a backend kind.
    pub fn register(&mut self, kind: &'static str, builder: StoreBuilder) {
        self.builders.insert(kind, builder);
    }

    /// Supported backend kinds, for diagnostics.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.builders.keys().copied().collect()
    }

    /// Build and connect the store for `kind`. `url == None` resolves to
    /// the backend's own default URL.
    pub async fn connect(&self, kind: &str, url: Option<String>) -> Result<Arc<dyn StateStore>> {
        let builder = self.builders.get(kind).ok_or_else(|| {
            StoreError::UnsupportedBackend {
                kind: kind.to_string(),
                supported: self.kinds().join(", "),
            }
        })?;
        info!("Selecting state store backend: {}", kind);
        builder(url).await
    }
}

fn build_etcd(url: Option<String>) -> BoxFuture<'static, Result<Arc<dyn StateStore>>> {
    Box::pin(async move {
        let store = EtcdStore::connect(url.as_deref()).await?;
        Ok(Arc::new(store) as Arc<dyn StateStore>)
    })
}

fn build_consul(url: Option<String>) -> BoxFuture<'static, Result<Arc<dyn StateStore>>> {
    Box::pin(async move {
        let store = ConsulStore::connect(url.as_deref()).await?;
        Ok(Arc::new(store) as Arc<dyn StateStore>)
    })
}

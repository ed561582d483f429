//! Packet-tag pool collaborator
//!
//! The reconciliation core treats identifier allocation as an opaque
//! service: it asks for a tag when a network pins none and hands the tag
//! back on delete. The pool itself lives in the state store so allocations
//! survive a daemon restart.

use crate::Result;
use fabric_store::{read_json, write_json, StateStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Store key for the persisted tag pool
pub const PKT_TAG_POOL_KEY: &str = "/fabric/resources/pkt-tags";

#[derive(Debug, Default, Serialize, Deserialize)]
struct TagPool {
    /// Next never-used tag (tags start at 1)
    next: u32,
    /// Released tags available for reuse
    freed: BTreeSet<u32>,
}

/// Allocates finite packet tags from a pool persisted through the state
/// store. Initialized once at daemon startup; an init failure is fatal.
pub struct ResourceManager {
    store: Arc<dyn StateStore>,
}

impl ResourceManager {
    /// Seed the pool record if this is the first daemon ever to run
    /// against the store, then hand back the manager.
    pub async fn init(store: Arc<dyn StateStore>) -> Result<Self> {
        match read_json::<TagPool>(store.as_ref(), PKT_TAG_POOL_KEY).await {
            Ok(pool) => {
                info!(
                    "Resource manager attached: next tag {}, {} freed",
                    pool.next.max(1),
                    pool.freed.len()
                );
            }
            Err(StoreError::NotFound(_)) => {
                let pool = TagPool {
                    next: 1,
                    freed: BTreeSet::new(),
                };
                write_json(store.as_ref(), PKT_TAG_POOL_KEY, &pool).await?;
                info!("Resource manager initialized a fresh tag pool");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Self { store })
    }

    async fn load(&self) -> Result<TagPool> {
        match read_json(self.store.as_ref(), PKT_TAG_POOL_KEY).await {
            Ok(pool) => Ok(pool),
            Err(StoreError::NotFound(_)) => Ok(TagPool {
                next: 1,
                freed: BTreeSet::new(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Allocate a packet tag, preferring released tags over fresh ones.
    pub async fn allocate_pkt_tag(&self) -> Result<u32> {
        let mut pool = self.load().await?;
        let tag = match pool.freed.iter().next().copied() {
            Some(tag) => {
                pool.freed.remove(&tag);
                tag
            }
            None => {
                let tag = pool.next.max(1);
                pool.next = tag + 1;
                tag
            }
        };
        write_json(self.store.as_ref(), PKT_TAG_POOL_KEY, &pool).await?;
        debug!("Allocated packet tag {}", tag);
        Ok(tag)
    }

    /// Return a tag to the pool. Releasing an unknown tag is harmless.
    pub async fn release_pkt_tag(&self, tag: u32) -> Result<()> {
        let mut pool = self.load().await?;
        pool.freed.insert(tag);
        write_json(self.store.as_ref(), PKT_TAG_POOL_KEY, &pool).await?;
        debug!("Released packet tag {}", tag);
        Ok(())
    }
}

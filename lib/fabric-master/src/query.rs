//! Read-back queries over operational state
//!
//! One textual parameter covers two operations: the reserved id `"all"`
//! scans the whole collection (possibly empty), any other id is a point
//! lookup that yields exactly one object or a not-found error — never an
//! empty success. No real object may be named `all`; that convention is
//! assumed, not enforced at write time.

use crate::{MasterError, Result};
use fabric_api::state::{ENDPOINT_PREFIX, NETWORK_PREFIX};
use fabric_api::{endpoint_key, network_key, ALL_ID};
use fabric_store::{StateStore, StoreError};
use std::sync::Arc;
use tracing::debug;

/// Kind of operational-state object a query addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectType {
    Endpoint,
    Network,
}

impl ObjectType {
    fn prefix(self) -> &'static str {
        match self {
            ObjectType::Endpoint => ENDPOINT_PREFIX,
            ObjectType::Network => NETWORK_PREFIX,
        }
    }

    fn key(self, id: &str) -> String {
        match self {
            ObjectType::Endpoint => endpoint_key(id),
            ObjectType::Network => network_key(id),
        }
    }

    fn not_found(self, id: &str) -> MasterError {
        match self {
            ObjectType::Endpoint => MasterError::EndpointNotFound(id.to_string()),
            ObjectType::Network => MasterError::NetworkNotFound(id.to_string()),
        }
    }
}

/// Read-only retrieval of operational-state objects. Objects are fetched
/// from the store and re-serialized; this service never constructs them.
pub struct QueryService {
    store: Arc<dyn StateStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Fetch by id, or every object of the type for the `"all"` sentinel.
    pub async fn get(&self, object_type: ObjectType, id: &str) -> Result<Vec<serde_json::Value>> {
        if id == ALL_ID {
            let raws = self.store.read_all(object_type.prefix()).await?;
            debug!("Query {:?}/all: {} object(s)", object_type, raws.len());
            return raws
                .iter()
                .map(|raw| serde_json::from_slice(raw).map_err(MasterError::from))
                .collect();
        }

        match self.store.read(&object_type.key(id)).await {
            Ok(raw) => Ok(vec![serde_json::from_slice(&raw)?]),
            Err(StoreError::NotFound(_)) => Err(object_type.not_found(id)),
            Err(e) => Err(e.into()),
        }
    }
}

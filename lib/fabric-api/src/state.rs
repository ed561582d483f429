//! Operational-state records persisted in the distributed store
//!
//! These are written by the network driver when intent is reconciled and
//! read back verbatim by the query routes. The query layer never builds
//! them; it only fetches and re-serializes.

use serde::{Deserialize, Serialize};

/// Store prefix for materialized networks
pub const NETWORK_PREFIX: &str = "/fabric/oper/networks/";
/// Store prefix for materialized endpoints
pub const ENDPOINT_PREFIX: &str = "/fabric/oper/endpoints/";

/// Store key for a network id
pub fn network_key(id: &str) -> String {
    format!("{NETWORK_PREFIX}{id}")
}

/// Store key for a network-qualified endpoint id
pub fn endpoint_key(id: &str) -> String {
    format!("{ENDPOINT_PREFIX}{id}")
}

/// Materialized network
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkState {
    /// Network name (identity within the network namespace)
    pub id: String,

    /// Encapsulation type: "vlan" or "vxlan"
    pub pkt_tag_type: String,

    /// Packet tag in use, pinned by intent or pool-allocated
    pub pkt_tag: u32,

    /// Whether the tag came from the pool and must be released on delete
    #[serde(default)]
    pub pkt_tag_allocated: bool,

    /// Subnet CIDR, when declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
}

/// Materialized endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointState {
    /// Network-qualified endpoint id
    pub id: String,

    /// Endpoint name within its network
    pub name: String,

    /// Network this endpoint attaches to
    pub network: String,

    /// Host the endpoint is bound to, set at creation or by a host binding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Assigned IP address, when declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

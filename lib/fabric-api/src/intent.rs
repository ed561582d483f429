//! Declarative intent documents posted to the write routes

use serde::{Deserialize, Serialize};

/// Config is the intent document: the desired set of networks, endpoints
/// and host bindings. Every section defaults to empty so partial documents
/// (for example a networks-only body) decode cleanly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Desired networks
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,

    /// Desired endpoints
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    /// Endpoint-to-host bindings, reconciled outside the delete/add cycle
    #[serde(default)]
    pub host_bindings: Vec<HostBinding>,
}

/// Desired configuration for one network
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Network name, unique within the network namespace
    pub name: String,

    /// Subnet CIDR for the network, forwarded opaquely to the driver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,

    /// Encapsulation type: "vlan" or "vxlan"
    #[serde(default = "default_pkt_tag_type")]
    pub pkt_tag_type: String,

    /// Pinned packet tag. When absent one is allocated from the pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkt_tag: Option<u32>,
}

/// Desired configuration for one endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    /// Endpoint name, unique within its network
    pub name: String,

    /// Name of the network this endpoint attaches to
    pub network: String,

    /// Host the endpoint is scheduled on, if known at declaration time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Requested IP address, forwarded opaquely to the driver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl EndpointConfig {
    /// Store-wide endpoint identity: network-qualified name.
    pub fn id(&self) -> String {
        format!("{}-{}", self.network, self.name)
    }
}

/// Binding of an already-declared endpoint to a host
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostBinding {
    /// Network-qualified endpoint id
    pub endpoint: String,

    /// Host to bind the endpoint to
    pub host: String,
}

fn default_pkt_tag_type() -> String {
    "vlan".to_string()
}

//! Fabric API types shared across the control plane
//!
//! This library defines the wire-level documents of the fabric daemon:
//! - Config: the declarative intent posted by callers (networks,
//!   endpoints, host bindings)
//! - NetworkState / EndpointState: operational-state records persisted in
//!   the distributed store and served back by the query routes

pub mod intent;
pub mod state;

pub use intent::{Config, EndpointConfig, HostBinding, NetworkConfig};
pub use state::{endpoint_key, network_key, EndpointState, NetworkState};

/// Reserved identifier meaning "every object of this type".
pub const ALL_ID: &str = "all";

//! Reconciliation and query layer of the fabric control plane
//!
//! This library provides:
//! - Reconciler: converges stored state toward a posted intent document
//!   (full delete pass, then full add pass)
//! - QueryService: read-back of operational state with the "all" sentinel
//! - NetworkDriver: materializes network/endpoint records in the store
//! - ResourceManager: packet-tag pool collaborator

pub mod drivers;
pub mod error;
pub mod query;
pub mod reconcile;
pub mod resources;

pub use drivers::NetworkDriver;
pub use error::{MasterError, Result};
pub use query::{ObjectType, QueryService};
pub use reconcile::Reconciler;
pub use resources::ResourceManager;

//! Distributed state-store adapters for the fabric control plane
//!
//! This library provides:
//! - The `StateStore` trait: uniform CRUD + enumerate over a distributed
//!   key-value backend
//! - Interchangeable backends: etcd (quorum store) and consul
//!   (session/TTL store), both speaking their native HTTP APIs
//! - A registry mapping backend-kind keys to constructors, resolved once
//!   at daemon startup
//! - An in-memory store for tests

pub mod consul;
pub mod error;
pub mod etcd;
pub mod mem;
pub mod registry;
pub mod store;

pub use consul::ConsulStore;
pub use error::{Result, StoreError};
pub use etcd::EtcdStore;
pub use mem::MemStore;
pub use registry::{StoreRegistry, CONSUL_BACKEND, ETCD_BACKEND};
pub use store::{delete_existing, read_json, write_json, StateStore};

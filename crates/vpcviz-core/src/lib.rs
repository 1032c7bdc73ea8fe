//! Snapshot refresh-and-distribution engine between `vpcviz-api` and the
//! HTTP front end.
//!
//! - **[`Engine`]**: Owns the inventory capability and the store. On
//!   [`start()`](Engine::start) it spawns one single-flight refresh task per
//!   lineage: refresh once eagerly, then again a fixed period after each
//!   refresh completes.
//!
//! - **[`joiner`]**: Builds the nested network and stack trees from flat,
//!   foreign-key-filtered listings. Root listing failures abort the build;
//!   child listing failures degrade to an empty branch and are recorded.
//!
//! - **[`SnapshotStore`]**: One current [`Snapshot`] per lineage, replaced by
//!   reference (`ArcSwap`), never mutated in place. Readers never block and
//!   never observe a generation older than one they have already seen.
//!
//! - **[`Publisher`]**: Independent per-viewer delivery loop: re-read the
//!   current snapshot, send it, sleep, repeat. No shared queue between
//!   viewers.
//!
//! - **Domain model** ([`model`]): `Network` → `Subnet` → `Instance`, and
//!   `Stack` → (`Instance`, `ScalingGroup`, `StackMember`).

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod joiner;
pub mod model;
pub mod publisher;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EngineConfig, InventoryConfig, TlsVerification};
pub use engine::Engine;
pub use error::{BranchKind, CoreError, DeliveryError, FetchError, PartialFetchError};
pub use inventory::{Call, Inventory, StaticInventory};
pub use publisher::{DeliveryOutcome, Publisher, SnapshotSink};
pub use store::{LineageStore, RefreshStatus, SnapshotStore};

pub use model::{
    DegradedBranch, Instance, Lineage, Network, NetworkTopology, Resource, ResourceKind,
    ScalingGroup, Snapshot, Stack, StackMember, StackTopology, Subnet, Topology,
};

// The HTTP inventory client, so callers need not depend on `vpcviz-api`.
pub use vpcviz_api::InventoryClient;

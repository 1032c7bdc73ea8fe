// ── Domain model ──
//
// Canonical topology types. Everything here is immutable once a snapshot
// has been published; a refresh builds fresh trees instead of editing old
// ones.

mod network;
mod resource;
mod snapshot;
mod stack;

pub use network::{Instance, Network, NetworkTopology, Subnet};
pub use resource::{Resource, ResourceKind};
pub use snapshot::{DegradedBranch, Joined, Lineage, Snapshot, Topology};
pub use stack::{ScalingGroup, Stack, StackMember, StackTopology};

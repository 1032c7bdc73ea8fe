use std::sync::Arc;

use super::lineage::LineageStore;
use crate::model::{NetworkTopology, Snapshot, StackTopology, Topology};

/// Both lineages. Shared as `Arc<SnapshotStore>` between the refresh
/// tasks, the publishers and the request handlers.
pub struct SnapshotStore {
    networks: LineageStore<NetworkTopology>,
    stacks: LineageStore<StackTopology>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            networks: LineageStore::new(),
            stacks: LineageStore::new(),
        }
    }

    pub fn networks(&self) -> &LineageStore<NetworkTopology> {
        &self.networks
    }

    pub fn stacks(&self) -> &LineageStore<StackTopology> {
        &self.stacks
    }

    /// The store for lineage `T`, for code generic over both.
    pub fn lineage<T: Topology>(&self) -> &LineageStore<T> {
        T::lineage(self)
    }

    pub fn current<T: Topology>(&self) -> Arc<Snapshot<T>> {
        self.lineage::<T>().current()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

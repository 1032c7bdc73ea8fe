use std::future::Future;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::network::NetworkTopology;
use super::stack::StackTopology;
use crate::error::{BranchKind, FetchError, PartialFetchError};
use crate::inventory::Inventory;
use crate::joiner;
use crate::store::{LineageStore, SnapshotStore};

/// One of the two independent snapshot series.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Lineage {
    Network,
    Stack,
}

/// A published, immutable view of one lineage.
///
/// Serialized as the topology's own fields plus `Generation`,
/// `CapturedAt`, and `Degraded` when something went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot<T> {
    /// 0 for the empty placeholder, then strictly increasing per lineage.
    pub generation: u64,
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<DegradedBranch>,
    #[serde(flatten)]
    pub topology: T,
}

impl<T: Default> Snapshot<T> {
    /// The placeholder served before the first successful refresh.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            captured_at: None,
            degraded: Vec::new(),
            topology: T::default(),
        }
    }
}

impl<T> Snapshot<T> {
    pub fn is_placeholder(&self) -> bool {
        self.generation == 0
    }
}

/// A child collection that was replaced by an empty list because its
/// listing failed, as opposed to one the provider reported as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DegradedBranch {
    pub parent: String,
    pub branch: String,
    pub error: String,
}

impl From<&PartialFetchError> for DegradedBranch {
    fn from(err: &PartialFetchError) -> Self {
        Self {
            parent: err.parent.clone(),
            branch: err.branch.to_string(),
            error: err.source.to_string(),
        }
    }
}

/// Output of one joiner run, before a generation is stamped on it.
#[derive(Debug, Default)]
pub struct Joined<T> {
    pub topology: T,
    pub degraded: Vec<DegradedBranch>,
}

impl<T> Joined<T> {
    pub(crate) fn new(topology: T) -> Self {
        Self {
            topology,
            degraded: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, lineage: Lineage, parent: &str, branch: BranchKind, source: FetchError) {
        let err = PartialFetchError {
            lineage,
            parent: parent.to_owned(),
            branch,
            source,
        };
        tracing::warn!(
            %lineage,
            parent = %err.parent,
            %branch,
            error = %err.source,
            "child listing failed; branch left empty"
        );
        self.degraded.push(DegradedBranch::from(&err));
    }
}

/// A lineage body: knows how to build itself from an inventory and where
/// it lives in the [`SnapshotStore`].
pub trait Topology:
    Default + Serialize + DeserializeOwned + Send + Sync + std::fmt::Debug + 'static
{
    const LINEAGE: Lineage;

    fn build<I: Inventory>(
        inventory: &I,
        concurrency: usize,
    ) -> impl Future<Output = Result<Joined<Self>, FetchError>> + Send;

    fn lineage(store: &SnapshotStore) -> &LineageStore<Self>;
}

impl Topology for NetworkTopology {
    const LINEAGE: Lineage = Lineage::Network;

    async fn build<I: Inventory>(
        inventory: &I,
        concurrency: usize,
    ) -> Result<Joined<Self>, FetchError> {
        joiner::build_network_topology(inventory, concurrency).await
    }

    fn lineage(store: &SnapshotStore) -> &LineageStore<Self> {
        store.networks()
    }
}

impl Topology for StackTopology {
    const LINEAGE: Lineage = Lineage::Stack;

    async fn build<I: Inventory>(
        inventory: &I,
        concurrency: usize,
    ) -> Result<Joined<Self>, FetchError> {
        joiner::build_stack_topology(inventory, concurrency).await
    }

    fn lineage(store: &SnapshotStore) -> &LineageStore<Self> {
        store.stacks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_is_generation_zero() {
        let snap: Snapshot<NetworkTopology> = Snapshot::empty();
        assert_eq!(snap.generation, 0);
        assert!(snap.is_placeholder());
        assert!(snap.captured_at.is_none());
        assert!(snap.topology.vpcs.is_empty());
    }

    #[test]
    fn empty_snapshot_json_shape() {
        let snap: Snapshot<StackTopology> = Snapshot::empty();
        let json = serde_json::to_string(&snap).unwrap_or_default();
        assert_eq!(json, r#"{"Generation":0,"CapturedAt":null,"Stacks":[]}"#);
    }

    #[test]
    fn degraded_is_emitted_only_when_present() {
        let mut snap: Snapshot<NetworkTopology> = Snapshot::empty();
        snap.degraded.push(DegradedBranch {
            parent: "subnet-1".into(),
            branch: BranchKind::Instances.to_string(),
            error: "Inventory credentials rejected".into(),
        });
        let value = serde_json::to_value(&snap).unwrap_or_default();
        assert_eq!(value["Degraded"][0]["Parent"], "subnet-1");
        assert_eq!(value["Degraded"][0]["Branch"], "instances");
    }
}

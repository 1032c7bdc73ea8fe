// ── Inventory capability ──
//
// The engine's only view of the cloud provider: six idempotent listing
// calls, each filtered server-side by at most one foreign key. The HTTP
// client from `vpcviz-api` is the production implementation;
// `StaticInventory` serves fixture data for demos and tests.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use vpcviz_api::InventoryClient;
use vpcviz_api::types::{
    InstanceRecord, NetworkRecord, ScalingGroupInstance, StackResourceRecord, StackSummary,
    SubnetRecord, Tag,
};

use crate::error::{CoreError, FetchError};

/// Read-only listing operations against a cloud inventory.
///
/// Every call may fail with a [`FetchError`]; whether that aborts a refresh
/// or only empties one branch is the joiner's decision, not the
/// implementor's.
pub trait Inventory: Send + Sync + 'static {
    fn list_networks(&self) -> impl Future<Output = Result<Vec<NetworkRecord>, FetchError>> + Send;

    fn list_subnets(
        &self,
        network_id: &str,
    ) -> impl Future<Output = Result<Vec<SubnetRecord>, FetchError>> + Send;

    fn list_instances(
        &self,
        subnet_id: &str,
    ) -> impl Future<Output = Result<Vec<InstanceRecord>, FetchError>> + Send;

    fn list_stacks(&self) -> impl Future<Output = Result<Vec<StackSummary>, FetchError>> + Send;

    fn list_stack_resources(
        &self,
        stack_name: &str,
    ) -> impl Future<Output = Result<Vec<StackResourceRecord>, FetchError>> + Send;

    fn list_scaling_group_instances(
        &self,
        group_name: &str,
    ) -> impl Future<Output = Result<Vec<ScalingGroupInstance>, FetchError>> + Send;
}

// ── HTTP implementation ─────────────────────────────────────────────

impl Inventory for InventoryClient {
    async fn list_networks(&self) -> Result<Vec<NetworkRecord>, FetchError> {
        Ok(InventoryClient::list_networks(self).await?)
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<SubnetRecord>, FetchError> {
        Ok(InventoryClient::list_subnets(self, network_id).await?)
    }

    async fn list_instances(&self, subnet_id: &str) -> Result<Vec<InstanceRecord>, FetchError> {
        Ok(InventoryClient::list_instances(self, subnet_id).await?)
    }

    async fn list_stacks(&self) -> Result<Vec<StackSummary>, FetchError> {
        Ok(InventoryClient::list_stacks(self).await?)
    }

    async fn list_stack_resources(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackResourceRecord>, FetchError> {
        Ok(InventoryClient::list_stack_resources(self, stack_name).await?)
    }

    async fn list_scaling_group_instances(
        &self,
        group_name: &str,
    ) -> Result<Vec<ScalingGroupInstance>, FetchError> {
        Ok(InventoryClient::list_scaling_group_instances(self, group_name).await?)
    }
}

// ── In-memory implementation ────────────────────────────────────────

/// Identifies one listing call, for failure injection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    Networks,
    Subnets(String),
    Instances(String),
    Stacks,
    StackResources(String),
    ScalingGroupInstances(String),
}

/// Fixture-backed inventory.
///
/// Child records are stored flat and filtered by their foreign key on each
/// call, the same way the real service filters server-side. Loadable from
/// a JSON fixture (`vpcviz serve --fixture`), or assembled with the builder
/// methods.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticInventory {
    networks: Vec<NetworkRecord>,
    subnets: Vec<SubnetRecord>,
    instances: Vec<InstanceRecord>,
    stacks: Vec<StackSummary>,
    stack_resources: HashMap<String, Vec<StackResourceRecord>>,
    scaling_groups: HashMap<String, Vec<ScalingGroupInstance>>,
    #[serde(skip)]
    latency: Duration,
    #[serde(skip)]
    failures: Mutex<HashMap<Call, FetchError>>,
    #[serde(skip)]
    calls: AtomicUsize,
}

fn name_tags(name: &str) -> Vec<Tag> {
    if name.is_empty() {
        Vec::new()
    } else {
        vec![Tag {
            key: crate::convert::NAME_TAG.into(),
            value: name.into(),
        }]
    }
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON fixture from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            message: format!("cannot read fixture {}: {e}", path.display()),
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    // ── Builders ─────────────────────────────────────────────────────

    /// Add a network; an empty `name` leaves it untagged.
    pub fn network(mut self, id: &str, name: &str) -> Self {
        self.networks.push(NetworkRecord {
            vpc_id: id.into(),
            cidr_block: None,
            state: None,
            tags: name_tags(name),
        });
        self
    }

    pub fn subnet(mut self, network_id: &str, id: &str, name: &str) -> Self {
        self.subnets.push(SubnetRecord {
            subnet_id: id.into(),
            vpc_id: network_id.into(),
            cidr_block: None,
            availability_zone: None,
            tags: name_tags(name),
        });
        self
    }

    pub fn instance(mut self, subnet_id: &str, id: &str, name: &str) -> Self {
        self.instances.push(InstanceRecord {
            instance_id: id.into(),
            subnet_id: Some(subnet_id.into()),
            instance_type: None,
            state: None,
            tags: name_tags(name),
        });
        self
    }

    pub fn stack(mut self, name: &str) -> Self {
        self.stacks.push(StackSummary {
            stack_name: name.into(),
            stack_status: None,
        });
        self
    }

    pub fn stack_resource(
        mut self,
        stack_name: &str,
        resource_type: &str,
        logical_id: &str,
        physical_id: Option<&str>,
    ) -> Self {
        self.stack_resources
            .entry(stack_name.into())
            .or_default()
            .push(StackResourceRecord {
                resource_type: resource_type.into(),
                logical_resource_id: logical_id.into(),
                physical_resource_id: physical_id.map(Into::into),
            });
        self
    }

    pub fn group_member(mut self, group_name: &str, instance_id: &str) -> Self {
        self.scaling_groups
            .entry(group_name.into())
            .or_default()
            .push(ScalingGroupInstance {
                instance_id: instance_id.into(),
                lifecycle_state: None,
                health_status: None,
            });
        self
    }

    /// Delay every call by `latency` (simulates a slow upstream).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    // ── Failure injection ────────────────────────────────────────────

    /// Make `call` fail with `err` until [`heal`](Self::heal) is called.
    pub fn fail(&self, call: Call, err: FetchError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call, err);
    }

    pub fn heal(&self, call: &Call) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(call);
    }

    /// Total number of listing calls served (including failed ones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    async fn enter(&self, call: Call) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let failure = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&call)
            .cloned();
        failure.map_or(Ok(()), Err)
    }
}

impl Inventory for StaticInventory {
    async fn list_networks(&self) -> Result<Vec<NetworkRecord>, FetchError> {
        self.enter(Call::Networks).await?;
        Ok(self.networks.clone())
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<SubnetRecord>, FetchError> {
        self.enter(Call::Subnets(network_id.to_owned())).await?;
        Ok(self
            .subnets
            .iter()
            .filter(|s| s.vpc_id == network_id)
            .cloned()
            .collect())
    }

    async fn list_instances(&self, subnet_id: &str) -> Result<Vec<InstanceRecord>, FetchError> {
        self.enter(Call::Instances(subnet_id.to_owned())).await?;
        Ok(self
            .instances
            .iter()
            .filter(|i| i.subnet_id.as_deref() == Some(subnet_id))
            .cloned()
            .collect())
    }

    async fn list_stacks(&self) -> Result<Vec<StackSummary>, FetchError> {
        self.enter(Call::Stacks).await?;
        Ok(self.stacks.clone())
    }

    async fn list_stack_resources(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackResourceRecord>, FetchError> {
        self.enter(Call::StackResources(stack_name.to_owned()))
            .await?;
        Ok(self
            .stack_resources
            .get(stack_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_scaling_group_instances(
        &self,
        group_name: &str,
    ) -> Result<Vec<ScalingGroupInstance>, FetchError> {
        self.enter(Call::ScalingGroupInstances(group_name.to_owned()))
            .await?;
        Ok(self
            .scaling_groups
            .get(group_name)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn children_are_filtered_by_foreign_key() {
        let inv = StaticInventory::new()
            .network("vpc-1", "prod")
            .network("vpc-2", "")
            .subnet("vpc-1", "subnet-1", "")
            .subnet("vpc-2", "subnet-2", "")
            .instance("subnet-2", "i-9", "");

        let subnets = inv.list_subnets("vpc-1").await.unwrap();
        assert_eq!(subnets.len(), 1);
        assert_eq!(subnets[0].subnet_id, "subnet-1");
        assert!(inv.list_instances("subnet-1").await.unwrap().is_empty());
        assert_eq!(inv.list_instances("subnet-2").await.unwrap().len(), 1);
        assert_eq!(inv.call_count(), 3);
    }

    #[tokio::test]
    async fn injected_failures_can_be_healed() {
        let inv = StaticInventory::new().stack("app");
        inv.fail(Call::Stacks, FetchError::Unauthorized);
        assert_eq!(inv.list_stacks().await, Err(FetchError::Unauthorized));

        inv.heal(&Call::Stacks);
        assert_eq!(inv.list_stacks().await.unwrap().len(), 1);
    }

    #[test]
    fn fixture_json_parses() {
        let fixture = r#"{
            "networks": [{ "vpcId": "vpc-1", "tags": [{ "key": "Name", "value": "prod" }] }],
            "subnets": [{ "subnetId": "subnet-1", "vpcId": "vpc-1" }],
            "stackResources": {
                "app": [{ "resourceType": "AWS::EC2::Instance", "logicalResourceId": "Web", "physicalResourceId": "i-4" }]
            }
        }"#;
        let inv: StaticInventory = serde_json::from_str(fixture).unwrap();
        assert_eq!(inv.networks.len(), 1);
        assert_eq!(inv.subnets.len(), 1);
        assert_eq!(inv.stack_resources["app"][0].logical_resource_id, "Web");
        assert!(inv.stacks.is_empty());
    }
}

use serde::{Deserialize, Serialize};

use super::resource::{Resource, ResourceKind};

/// Body of the network lineage: every virtual network in the region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTopology {
    #[serde(rename = "VPCs")]
    pub vpcs: Vec<Network>,
}

impl NetworkTopology {
    pub fn subnet_count(&self) -> usize {
        self.vpcs.iter().map(|n| n.subnets.len()).sum()
    }

    pub fn instance_count(&self) -> usize {
        self.vpcs
            .iter()
            .flat_map(|n| &n.subnets)
            .map(|s| s.instances.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    #[serde(rename = "VPCID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    /// In the order the inventory listed them.
    #[serde(rename = "Subnets")]
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    #[serde(rename = "SubnetID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Instances")]
    pub instances: Vec<Instance>,
}

/// A compute instance, either inside a subnet or owned by a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(rename = "InstanceID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

impl Instance {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Resource for Network {
    const KIND: ResourceKind = ResourceKind::Network;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Resource for Subnet {
    const KIND: ResourceKind = ResourceKind::Subnet;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Resource for Instance {
    const KIND: ResourceKind = ResourceKind::Instance;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

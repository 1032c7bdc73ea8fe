use serde::{Deserialize, Serialize};

use super::network::Instance;
use super::resource::{Resource, ResourceKind};

/// Body of the stack lineage: every deployment stack in the region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTopology {
    #[serde(rename = "Stacks")]
    pub stacks: Vec<Stack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    #[serde(rename = "Name")]
    pub name: String,
    /// Members the joiner does not specialize.
    #[serde(rename = "Resources")]
    pub resources: Vec<StackMember>,
    /// Instances declared directly in the stack.
    #[serde(rename = "Instances")]
    pub instances: Vec<Instance>,
    #[serde(rename = "AutoScalingGroups")]
    pub scaling_groups: Vec<ScalingGroup>,
}

/// An autoscaling group owned by a stack.
///
/// Member instances carry only their identifier; their tag-derived name is
/// never resolved (it would cost one more call per group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingGroup {
    /// Physical group name.
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "LogicalID", default)]
    pub logical_id: String,
    #[serde(rename = "Instances")]
    pub instances: Vec<Instance>,
}

/// A stack member of any type other than instance or scaling group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackMember {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "LogicalID")]
    pub logical_id: String,
    /// Empty while the provider has not assigned one yet.
    #[serde(rename = "PhysicalID")]
    pub physical_id: String,
}

impl Resource for Stack {
    const KIND: ResourceKind = ResourceKind::Stack;

    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Resource for ScalingGroup {
    const KIND: ResourceKind = ResourceKind::ScalingGroup;

    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.logical_id
    }
}

impl Resource for StackMember {
    const KIND: ResourceKind = ResourceKind::OtherStackMember;

    fn id(&self) -> &str {
        &self.physical_id
    }

    fn name(&self) -> &str {
        &self.logical_id
    }

    fn label(&self) -> String {
        format!(
            "{} ({}) {}",
            self.logical_id, self.resource_type, self.physical_id
        )
    }
}

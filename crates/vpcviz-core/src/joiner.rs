// ── Topology joiner ──
//
// Turns flat, foreign-key-filtered listings into the nested trees. One
// call per parent (the N+1 fan-out), bounded by `concurrency` at each
// level with `buffered`, so children keep the order the inventory
// returned them in.
//
// Root listing failures propagate. Child listing failures empty their
// branch and are recorded on the `Joined` output.

use futures_util::{StreamExt, stream};
use vpcviz_api::types::{NetworkRecord, StackResourceRecord, StackSummary, SubnetRecord};

use crate::error::{BranchKind, FetchError};
use crate::inventory::Inventory;
use crate::model::{
    Instance, Joined, Lineage, Network, NetworkTopology, ScalingGroup, Stack, StackMember,
    StackTopology, Subnet,
};

/// Resource type for an instance declared directly in a stack.
pub const INSTANCE_TYPE: &str = "AWS::EC2::Instance";
/// Resource type for an autoscaling group declared in a stack.
pub const SCALING_GROUP_TYPE: &str = "AWS::AutoScaling::AutoScalingGroup";

/// A child listing that failed, before it is logged and recorded.
struct Failure {
    parent: String,
    branch: BranchKind,
    source: FetchError,
}

impl Failure {
    fn new(parent: &str, branch: BranchKind, source: FetchError) -> Self {
        Self {
            parent: parent.to_owned(),
            branch,
            source,
        }
    }
}

fn finish<T>(lineage: Lineage, topology: T, failures: Vec<Failure>) -> Joined<T> {
    let mut joined = Joined::new(topology);
    for f in failures {
        joined.record(lineage, &f.parent, f.branch, f.source);
    }
    joined
}

// ── Network lineage ─────────────────────────────────────────────────

/// Networks → subnets → instances.
pub async fn build_network_topology<I: Inventory>(
    inventory: &I,
    concurrency: usize,
) -> Result<Joined<NetworkTopology>, FetchError> {
    let concurrency = concurrency.max(1);
    let records = inventory.list_networks().await?;

    let branches: Vec<(Network, Vec<Failure>)> = stream::iter(records)
        .map(move |record| network_branch(inventory, record, concurrency))
        .buffered(concurrency)
        .collect()
        .await;

    let mut vpcs = Vec::with_capacity(branches.len());
    let mut failures = Vec::new();
    for (network, mut f) in branches {
        vpcs.push(network);
        failures.append(&mut f);
    }

    let joined = finish(Lineage::Network, NetworkTopology { vpcs }, failures);
    tracing::debug!(
        networks = joined.topology.vpcs.len(),
        subnets = joined.topology.subnet_count(),
        instances = joined.topology.instance_count(),
        degraded = joined.degraded.len(),
        "network topology joined"
    );
    Ok(joined)
}

async fn network_branch<I: Inventory>(
    inventory: &I,
    record: NetworkRecord,
    concurrency: usize,
) -> (Network, Vec<Failure>) {
    let mut network = Network::from(record);
    let subnets = match inventory.list_subnets(&network.id).await {
        Ok(subnets) => subnets,
        Err(e) => {
            let failure = Failure::new(&network.id, BranchKind::Subnets, e);
            return (network, vec![failure]);
        }
    };

    let filled: Vec<(Subnet, Option<Failure>)> = stream::iter(subnets)
        .map(move |record| subnet_branch(inventory, record))
        .buffered(concurrency)
        .collect()
        .await;

    let mut failures = Vec::new();
    for (subnet, failure) in filled {
        network.subnets.push(subnet);
        failures.extend(failure);
    }
    (network, failures)
}

async fn subnet_branch<I: Inventory>(
    inventory: &I,
    record: SubnetRecord,
) -> (Subnet, Option<Failure>) {
    let mut subnet = Subnet::from(record);
    match inventory.list_instances(&subnet.id).await {
        Ok(instances) => {
            subnet.instances = instances.into_iter().map(Instance::from).collect();
            (subnet, None)
        }
        Err(e) => {
            let failure = Failure::new(&subnet.id, BranchKind::Instances, e);
            (subnet, Some(failure))
        }
    }
}

// ── Stack lineage ───────────────────────────────────────────────────

/// Stacks → members, with autoscaling groups expanded into their
/// instances. A stack whose member listing fails is left out entirely.
pub async fn build_stack_topology<I: Inventory>(
    inventory: &I,
    concurrency: usize,
) -> Result<Joined<StackTopology>, FetchError> {
    let concurrency = concurrency.max(1);
    let summaries = inventory.list_stacks().await?;

    let branches: Vec<(Option<Stack>, Vec<Failure>)> = stream::iter(summaries)
        .map(move |summary| stack_branch(inventory, summary, concurrency))
        .buffered(concurrency)
        .collect()
        .await;

    let mut stacks = Vec::with_capacity(branches.len());
    let mut failures = Vec::new();
    for (stack, mut f) in branches {
        stacks.extend(stack);
        failures.append(&mut f);
    }

    let joined = finish(Lineage::Stack, StackTopology { stacks }, failures);
    tracing::debug!(
        stacks = joined.topology.stacks.len(),
        degraded = joined.degraded.len(),
        "stack topology joined"
    );
    Ok(joined)
}

/// Where one stack member lands in the tree.
enum Classified {
    Instance(Instance),
    Group { name: String, logical_id: String },
    Other(StackMember),
}

/// Sort a member by resource type. Instances and groups without a
/// physical id yet cannot be listed or labeled by id, so they stay
/// generic members.
fn classify(record: StackResourceRecord) -> Classified {
    let physical = record.physical_resource_id.filter(|id| !id.is_empty());
    match (record.resource_type.as_str(), physical) {
        (INSTANCE_TYPE, Some(id)) => Classified::Instance(Instance::new(id, record.logical_resource_id)),
        (SCALING_GROUP_TYPE, Some(id)) => Classified::Group {
            name: id,
            logical_id: record.logical_resource_id,
        },
        (_, physical) => Classified::Other(StackMember {
            resource_type: record.resource_type,
            logical_id: record.logical_resource_id,
            physical_id: physical.unwrap_or_default(),
        }),
    }
}

async fn stack_branch<I: Inventory>(
    inventory: &I,
    summary: StackSummary,
    concurrency: usize,
) -> (Option<Stack>, Vec<Failure>) {
    let name = summary.stack_name;
    let members = match inventory.list_stack_resources(&name).await {
        Ok(members) => members,
        Err(e) => {
            let failure = Failure::new(&name, BranchKind::StackResources, e);
            return (None, vec![failure]);
        }
    };

    let mut stack = Stack {
        name,
        resources: Vec::new(),
        instances: Vec::new(),
        scaling_groups: Vec::new(),
    };
    let mut groups = Vec::new();
    for member in members {
        match classify(member) {
            Classified::Instance(instance) => stack.instances.push(instance),
            Classified::Group { name, logical_id } => groups.push((name, logical_id)),
            Classified::Other(other) => stack.resources.push(other),
        }
    }

    let filled: Vec<(ScalingGroup, Option<Failure>)> = stream::iter(groups)
        .map(move |(name, logical_id)| group_branch(inventory, name, logical_id))
        .buffered(concurrency)
        .collect()
        .await;

    let mut failures = Vec::new();
    for (group, failure) in filled {
        stack.scaling_groups.push(group);
        failures.extend(failure);
    }
    (Some(stack), failures)
}

async fn group_branch<I: Inventory>(
    inventory: &I,
    name: String,
    logical_id: String,
) -> (ScalingGroup, Option<Failure>) {
    let mut group = ScalingGroup {
        name,
        logical_id,
        instances: Vec::new(),
    };
    match inventory.list_scaling_group_instances(&group.name).await {
        Ok(members) => {
            group.instances = members.into_iter().map(Instance::from).collect();
            (group, None)
        }
        Err(e) => {
            let failure = Failure::new(&group.name, BranchKind::ScalingGroupInstances, e);
            (group, Some(failure))
        }
    }
}

//! HTML rendering of snapshots.
//!
//! Pure functions from a snapshot to a page: one nested `<div>` per node,
//! classed by resource kind and labeled `id (name)`. An empty snapshot
//! renders as an empty page body.

use vpcviz_core::{
    Instance, Network, NetworkTopology, Resource, ScalingGroup, Snapshot, Stack, StackMember,
    StackTopology, Subnet,
};

fn header(out: &mut String, title: &str) {
    out.push_str("<html><head><title>");
    out.push_str(title);
    out.push_str(
        "</title><link rel=\"stylesheet\" type=\"text/css\" href=\"/assets/style.css\" /></head><body>",
    );
}

const LIVE_SCRIPT: &str = "<script src=\"/assets/app.js\" defer></script>";

fn footer(out: &mut String) {
    out.push_str("</body></html>");
}

/// Open a node for `resource`; the caller closes it.
fn open<R: Resource>(out: &mut String, resource: &R) {
    out.push_str("<div class=\"");
    out.push_str(R::KIND.as_ref());
    out.push_str("\">");
    escape_into(out, &resource.label());
}

fn close(out: &mut String) {
    out.push_str("</div>");
}

fn leaf<R: Resource>(out: &mut String, resource: &R) {
    open(out, resource);
    close(out);
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// The same page plus the script that keeps it current over the live feed.
pub fn with_live_feed(page: &str) -> String {
    page.replacen("</head>", &format!("{LIVE_SCRIPT}</head>"), 1)
}

// ── Network lineage ─────────────────────────────────────────────────

pub fn render_networks(snapshot: &Snapshot<NetworkTopology>) -> String {
    let mut out = String::new();
    header(&mut out, "vpc");
    for network in &snapshot.topology.vpcs {
        network_node(&mut out, network);
    }
    footer(&mut out);
    out
}

fn network_node(out: &mut String, network: &Network) {
    open(out, network);
    for subnet in &network.subnets {
        subnet_node(out, subnet);
    }
    close(out);
}

fn subnet_node(out: &mut String, subnet: &Subnet) {
    open(out, subnet);
    for instance in &subnet.instances {
        leaf::<Instance>(out, instance);
    }
    close(out);
}

// ── Stack lineage ───────────────────────────────────────────────────

pub fn render_stacks(snapshot: &Snapshot<StackTopology>) -> String {
    let mut out = String::new();
    header(&mut out, "stack");
    for stack in &snapshot.topology.stacks {
        stack_node(&mut out, stack);
    }
    footer(&mut out);
    out
}

fn stack_node(out: &mut String, stack: &Stack) {
    open(out, stack);
    for group in &stack.scaling_groups {
        group_node(out, group);
    }
    for instance in &stack.instances {
        leaf::<Instance>(out, instance);
    }
    for member in &stack.resources {
        leaf::<StackMember>(out, member);
    }
    close(out);
}

fn group_node(out: &mut String, group: &ScalingGroup) {
    open(out, group);
    for instance in &group.instances {
        leaf::<Instance>(out, instance);
    }
    close(out);
}

use serde::{Deserialize, Serialize};

/// The kinds of node a topology tree can contain.
///
/// `as_ref()` yields the short class name used by renderers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
pub enum ResourceKind {
    #[strum(serialize = "vpc")]
    Network,
    #[strum(serialize = "subnet")]
    Subnet,
    #[strum(serialize = "instance")]
    Instance,
    #[strum(serialize = "stack")]
    Stack,
    #[strum(serialize = "asg")]
    ScalingGroup,
    #[strum(serialize = "resource")]
    OtherStackMember,
}

/// Common view over every node in a topology tree: a provider-assigned
/// identifier plus a display name that may be empty.
pub trait Resource {
    const KIND: ResourceKind;

    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// `"{id} ({name})"`. The parentheses stay even when the name is empty.
    fn label(&self) -> String {
        format!("{} ({})", self.id(), self.name())
    }
}

// ── Core error types ──
//
// Three failure classes, by blast radius:
//   FetchError        root listing failed; the refresh is abandoned
//   PartialFetchError one child listing failed; that branch is emptied
//   DeliveryError     one viewer's connection failed; only its loop ends
//
// Consumers never see HTTP status codes or JSON parse failures directly.
// The `From<vpcviz_api::Error>` impl lives in `convert.rs`.

use serde::Serialize;
use thiserror::Error;

use crate::model::Lineage;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    PartialFetch(#[from] PartialFetchError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Engine is already running")]
    AlreadyRunning,

    #[error("Engine has been shut down")]
    ShutDown,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A listing call against the inventory failed.
///
/// `Clone` so in-memory inventories can replay the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Inventory service unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Inventory request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Inventory credentials rejected")]
    Unauthorized,

    #[error("Inventory API throttled -- retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    #[error("Inventory API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        code: Option<String>,
    },

    #[error("Malformed inventory response: {message}")]
    Malformed { message: String },
}

impl FetchError {
    /// Whether the next scheduled refresh has a fair chance of succeeding
    /// without anyone changing configuration.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::Throttled { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            Self::Unauthorized | Self::Malformed { .. } => false,
        }
    }
}

/// Which child collection a partial failure emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum BranchKind {
    #[strum(serialize = "subnets")]
    Subnets,
    #[strum(serialize = "instances")]
    Instances,
    #[strum(serialize = "stack resources")]
    StackResources,
    #[strum(serialize = "scaling group instances")]
    ScalingGroupInstances,
}

/// A child listing failed; the refresh continued without that branch.
#[derive(Debug, Clone, Error)]
#[error("{lineage} refresh: listing {branch} of {parent} failed: {source}")]
pub struct PartialFetchError {
    pub lineage: Lineage,
    /// Identifier of the resource whose children could not be listed.
    pub parent: String,
    pub branch: BranchKind,
    #[source]
    pub source: FetchError,
}

/// Writing a snapshot to one live viewer failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Viewer connection closed")]
    Closed,

    #[error("Viewer connection failed: {reason}")]
    Transport { reason: String },

    #[error("Snapshot could not be serialized: {reason}")]
    Serialization { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_fetch_message_names_the_branch() {
        let err = PartialFetchError {
            lineage: Lineage::Network,
            parent: "subnet-1".into(),
            branch: BranchKind::Instances,
            source: FetchError::Timeout { timeout_secs: 30 },
        };
        assert_eq!(
            err.to_string(),
            "network refresh: listing instances of subnet-1 failed: \
             Inventory request timed out after 30s"
        );
    }

    #[test]
    fn server_side_failures_are_transient() {
        assert!(FetchError::Timeout { timeout_secs: 30 }.is_transient());
        assert!(FetchError::Throttled { retry_after_secs: 2 }.is_transient());
        assert!(
            FetchError::Api {
                message: "internal failure".into(),
                status: Some(503),
                code: None,
            }
            .is_transient()
        );
        assert!(
            !FetchError::Api {
                message: "no such stack".into(),
                status: Some(404),
                code: Some("ValidationError".into()),
            }
            .is_transient()
        );
        assert!(!FetchError::Unauthorized.is_transient());
        assert!(!FetchError::Malformed { message: "eof".into() }.is_transient());
    }

    #[test]
    fn root_failures_wrap_transparently() {
        let err = CoreError::from(FetchError::Unauthorized);
        assert_eq!(err.to_string(), "Inventory credentials rejected");
    }
}

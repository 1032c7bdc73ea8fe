// ── API-to-domain type conversions ──
//
// Bridges raw `vpcviz_api` records into canonical domain types, and
// transport errors into the fetch-error taxonomy. Display names come from
// the `Name` tag; a resource without one gets an empty name.

use vpcviz_api::types::{InstanceRecord, NetworkRecord, ScalingGroupInstance, SubnetRecord, Tag};

use crate::error::FetchError;
use crate::model::{Instance, Network, Subnet};

/// Tag key the provider console uses for display names.
pub const NAME_TAG: &str = "Name";

/// Value of the first tag whose key matches exactly, or `""`.
pub fn tag_value<'a>(tags: &'a [Tag], key: &str) -> &'a str {
    tags.iter()
        .find(|t| t.key == key)
        .map_or("", |t| t.value.as_str())
}

// ── Records → domain ────────────────────────────────────────────────

/// A network with no subnets attached yet.
impl From<NetworkRecord> for Network {
    fn from(r: NetworkRecord) -> Self {
        Self {
            name: tag_value(&r.tags, NAME_TAG).to_owned(),
            id: r.vpc_id,
            subnets: Vec::new(),
        }
    }
}

/// A subnet with no instances attached yet.
impl From<SubnetRecord> for Subnet {
    fn from(r: SubnetRecord) -> Self {
        Self {
            name: tag_value(&r.tags, NAME_TAG).to_owned(),
            id: r.subnet_id,
            instances: Vec::new(),
        }
    }
}

impl From<InstanceRecord> for Instance {
    fn from(r: InstanceRecord) -> Self {
        Self {
            name: tag_value(&r.tags, NAME_TAG).to_owned(),
            id: r.instance_id,
        }
    }
}

/// Group members keep only their identifier.
impl From<ScalingGroupInstance> for Instance {
    fn from(r: ScalingGroupInstance) -> Self {
        Self {
            id: r.instance_id,
            name: String::new(),
        }
    }
}

// ── Transport errors → fetch errors ─────────────────────────────────

impl From<vpcviz_api::Error> for FetchError {
    fn from(err: vpcviz_api::Error) -> Self {
        match err {
            vpcviz_api::Error::InvalidApiKey => FetchError::Unauthorized,
            vpcviz_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    FetchError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    FetchError::Unreachable {
                        reason: e.to_string(),
                    }
                } else {
                    FetchError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                        code: None,
                    }
                }
            }
            vpcviz_api::Error::InvalidUrl(e) => FetchError::Unreachable {
                reason: format!("invalid URL: {e}"),
            },
            vpcviz_api::Error::Timeout { timeout_secs } => FetchError::Timeout { timeout_secs },
            vpcviz_api::Error::Tls(reason) => FetchError::Unreachable {
                reason: format!("TLS error: {reason}"),
            },
            vpcviz_api::Error::RateLimited { retry_after_secs } => {
                FetchError::Throttled { retry_after_secs }
            }
            vpcviz_api::Error::Api {
                message,
                code,
                status,
            } => FetchError::Api {
                message,
                status: Some(status),
                code,
            },
            vpcviz_api::Error::Deserialization { message, body: _ } => {
                FetchError::Malformed { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(key: &str, value: &str) -> Tag {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }

    #[test]
    fn tag_lookup_is_exact_and_defaults_empty() {
        let tags = vec![tag("name", "lower"), tag("Name", "prod"), tag("Name", "dup")];
        assert_eq!(tag_value(&tags, NAME_TAG), "prod");
        assert_eq!(tag_value(&tags, "Owner"), "");
        assert_eq!(tag_value(&[], NAME_TAG), "");
    }

    #[test]
    fn instance_record_takes_name_tag() {
        let record = InstanceRecord {
            instance_id: "i-1".into(),
            subnet_id: Some("subnet-1".into()),
            instance_type: None,
            state: None,
            tags: vec![tag("Name", "web-1")],
        };
        assert_eq!(Instance::from(record), Instance::new("i-1", "web-1"));
    }

    #[test]
    fn group_member_has_no_name() {
        let member = ScalingGroupInstance {
            instance_id: "i-2".into(),
            lifecycle_state: Some("InService".into()),
            health_status: None,
        };
        assert_eq!(Instance::from(member), Instance::new("i-2", ""));
    }

    #[test]
    fn api_errors_map_into_fetch_errors() {
        assert_eq!(
            FetchError::from(vpcviz_api::Error::InvalidApiKey),
            FetchError::Unauthorized
        );
        assert_eq!(
            FetchError::from(vpcviz_api::Error::RateLimited { retry_after_secs: 3 }),
            FetchError::Throttled { retry_after_secs: 3 }
        );
        assert_eq!(
            FetchError::from(vpcviz_api::Error::Api {
                message: "denied".into(),
                code: Some("AccessDenied".into()),
                status: 400,
            }),
            FetchError::Api {
                message: "denied".into(),
                status: Some(400),
                code: Some("AccessDenied".into()),
            }
        );
    }
}

//! Distribution domain types
//!
//! The [`DistributionModel`] is the desired state of one group's CDN
//! distribution. It is rebuilt from the current descriptors every cycle and is
//! never mutated in place by the reconciler, except to attach the identity the
//! backend returned.

use crate::domain::{DistributionId, FunctionAssociation, GroupName};
use crate::services::specificity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend identity of an existing distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionIdentity {
    pub id: DistributionId,
    pub arn: String,
    /// DNS name the distribution serves on; alias records point here
    pub address: Option<String>,
}

impl DistributionIdentity {
    /// Recover the identity from a distribution ARN
    /// (`arn:<partition>:cloudfront::<account>:distribution/<id>`).
    pub fn from_arn(arn: impl Into<String>) -> Option<Self> {
        let arn = arn.into();
        let id = arn.rsplit_once(":distribution/").map(|(_, id)| id.to_string())?;
        if id.is_empty() {
            return None;
        }
        Some(Self { id: DistributionId::new(id), arn, address: None })
    }
}

/// Ordered rule mapping a path pattern to an origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Behavior {
    pub path_pattern: String,
    /// Host of the origin the behavior routes to
    pub target_origin: String,
    pub function_associations: Vec<FunctionAssociation>,
    pub origin_request_policy_id: Option<String>,
    pub cache_policy_id: Option<String>,
}

impl Behavior {
    pub fn new(path_pattern: impl Into<String>, target_origin: impl Into<String>) -> Self {
        Self {
            path_pattern: path_pattern.into(),
            target_origin: target_origin.into(),
            function_associations: vec![],
            origin_request_policy_id: None,
            cache_policy_id: None,
        }
    }
}

/// One origin with its behaviors, most specific first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub host: String,
    pub behaviors: Vec<Behavior>,
    /// Origin response timeout in seconds
    pub response_timeout: Option<u32>,
}

impl Origin {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), behaviors: vec![], response_timeout: None }
    }
}

/// Viewer TLS settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    pub certificate_arn: String,
    pub security_policy: String,
    pub ssl_support_method: String,
}

/// Access logging target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub bucket: String,
    pub prefix: String,
}

/// Desired state of one group's distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionModel {
    pub group: GroupName,
    pub description: String,
    /// Catch-all origin backing the default behavior
    pub default_origin: Origin,
    /// Origins contributed by descriptors, sorted by host
    pub origins: Vec<Origin>,
    /// Deduplicated alternate domain names, sorted
    pub alternate_domains: Vec<String>,
    pub tls: Option<TlsConfig>,
    pub web_acl_id: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub logging: Option<LoggingConfig>,
    pub ipv6_enabled: bool,
    pub identity: Option<DistributionIdentity>,
}

impl DistributionModel {
    /// A model with no descriptor origins converges to "no distribution"
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Whether the backend resource already exists
    pub fn exists(&self) -> bool {
        self.identity.is_some()
    }

    pub fn with_identity(mut self, identity: Option<DistributionIdentity>) -> Self {
        self.identity = identity;
        self
    }

    /// Every behavior across all origins in backend evaluation order.
    pub fn ordered_behaviors(&self) -> Vec<&Behavior> {
        let mut behaviors: Vec<&Behavior> =
            self.origins.iter().flat_map(|origin| origin.behaviors.iter()).collect();
        behaviors.sort_by(|a, b| specificity::compare(&a.path_pattern, &b.path_pattern));
        behaviors
    }

    /// Address alias records should point at, if the backend reported one
    pub fn address(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|identity| identity.address.as_deref())
    }
}

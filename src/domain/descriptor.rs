//! Route descriptor domain types
//!
//! A [`RouteDescriptor`] is the canonical, already-normalized form of one route
//! source. Every source format (see `crate::sources`) maps onto this single
//! value; the engine never sees the raw formats.

use crate::domain::{DescriptorRef, GroupName};
use crate::errors::{EdgeplaneError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// Longest origin response timeout the CDN accepts, in seconds.
pub const MAX_ORIGIN_RESPONSE_TIMEOUT_SECS: u32 = 180;

/// How a route path is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    /// Only the exact path matches
    Exact,
    /// The path and everything below it matches
    Prefix,
}

/// One path declared by a route source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSpec {
    pub pattern: String,
    pub match_kind: MatchKind,
}

impl PathSpec {
    pub fn exact(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), match_kind: MatchKind::Exact }
    }

    pub fn prefix(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), match_kind: MatchKind::Prefix }
    }
}

/// Request lifecycle event a function is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionEventType {
    ViewerRequest,
    ViewerResponse,
    OriginRequest,
    OriginResponse,
}

impl FunctionEventType {
    pub fn is_viewer(&self) -> bool {
        matches!(self, FunctionEventType::ViewerRequest | FunctionEventType::ViewerResponse)
    }
}

/// Runtime that executes an associated function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionKind {
    /// Lightweight viewer-side function, viewer events only
    Viewer,
    /// Full edge function, any event
    Edge,
}

/// A function attached to the behaviors generated from a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionAssociation {
    pub kind: FunctionKind,
    pub event_type: FunctionEventType,
    pub arn: String,
    #[serde(default)]
    pub include_body: bool,
}

/// Finalizer retention state of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FinalizerState {
    /// The managed finalizer is present; the source cannot disappear before cleanup
    Managed,
    /// The managed finalizer is absent
    #[default]
    Released,
}

/// Normalized representation of one route source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub reference: DescriptorRef,
    pub group: GroupName,
    /// Hostname of the provisioned origin; empty until provisioned
    pub origin_host: String,
    pub paths: Vec<PathSpec>,
    pub function_associations: Vec<FunctionAssociation>,
    pub origin_request_policy_id: Option<String>,
    pub cache_policy_id: Option<String>,
    /// Origin response timeout in seconds
    pub origin_response_timeout: Option<u32>,
    pub alternate_domains: Vec<String>,
    pub web_acl_id: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub being_removed: bool,
    pub provisioned: bool,
    pub finalizer: FinalizerState,
}

impl RouteDescriptor {
    /// Create an empty, unprovisioned descriptor
    pub fn new(reference: DescriptorRef, group: impl Into<GroupName>) -> Self {
        Self {
            reference,
            group: group.into(),
            origin_host: String::new(),
            paths: vec![],
            function_associations: vec![],
            origin_request_policy_id: None,
            cache_policy_id: None,
            origin_response_timeout: None,
            alternate_domains: vec![],
            web_acl_id: None,
            tags: BTreeMap::new(),
            being_removed: false,
            provisioned: false,
            finalizer: FinalizerState::Released,
        }
    }

    /// Mark the descriptor provisioned behind the given origin host
    pub fn with_origin(mut self, host: impl Into<String>) -> Self {
        self.origin_host = host.into();
        self.provisioned = true;
        self
    }

    pub fn with_path(mut self, path: PathSpec) -> Self {
        self.paths.push(path);
        self
    }

    pub fn with_alternate_domain(mut self, domain: impl Into<String>) -> Self {
        self.alternate_domains.push(domain.into());
        self
    }

    pub fn with_web_acl(mut self, web_acl_id: impl Into<String>) -> Self {
        self.web_acl_id = Some(web_acl_id.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_function(mut self, association: FunctionAssociation) -> Self {
        self.function_associations.push(association);
        self
    }

    pub fn with_finalizer(mut self, finalizer: FinalizerState) -> Self {
        self.finalizer = finalizer;
        self
    }

    pub fn removed(mut self) -> Self {
        self.being_removed = true;
        self
    }

    /// Membership predicate: same group, provisioned, not being removed
    pub fn is_member_of(&self, group: &GroupName) -> bool {
        &self.group == group && self.provisioned && !self.being_removed
    }

    /// Reject malformed input and incompatible option combinations.
    pub fn validate(&self) -> Result<()> {
        if self.group.is_empty() {
            return Err(EdgeplaneError::validation_field(
                format!("descriptor {} declares no group", self.reference),
                "group",
            ));
        }

        // A descriptor being removed contributes nothing to the build.
        if self.being_removed {
            return Ok(());
        }

        if self.provisioned && self.origin_host.trim().is_empty() {
            return Err(EdgeplaneError::validation_field(
                format!("descriptor {} is provisioned without an origin host", self.reference),
                "origin_host",
            ));
        }

        if self.paths.is_empty() {
            return Err(EdgeplaneError::validation_field(
                format!("descriptor {} declares no paths", self.reference),
                "paths",
            ));
        }

        for (idx, path) in self.paths.iter().enumerate() {
            if !path.pattern.starts_with('/') {
                return Err(EdgeplaneError::validation_field(
                    format!("path '{}' must start with '/'", path.pattern),
                    format!("paths[{}]", idx),
                ));
            }
            if path.match_kind == MatchKind::Exact && path.pattern.contains(['*', '?']) {
                return Err(EdgeplaneError::validation_field(
                    format!("exact path '{}' must not contain wildcards", path.pattern),
                    format!("paths[{}]", idx),
                ));
            }
        }

        for domain in &self.alternate_domains {
            if !is_valid_hostname(domain) {
                return Err(EdgeplaneError::validation_field(
                    format!("alternate domain '{}' is not a valid hostname", domain),
                    "alternate_domains",
                ));
            }
        }

        if let Some(timeout) = self.origin_response_timeout {
            if timeout == 0 || timeout > MAX_ORIGIN_RESPONSE_TIMEOUT_SECS {
                return Err(EdgeplaneError::validation_field(
                    format!(
                        "origin response timeout {}s is outside 1..={}",
                        timeout, MAX_ORIGIN_RESPONSE_TIMEOUT_SECS
                    ),
                    "origin_response_timeout",
                ));
            }
        }

        if self.origin_request_policy_id.is_some() && self.cache_policy_id.is_none() {
            return Err(EdgeplaneError::validation_field(
                "an origin request policy requires a cache policy",
                "origin_request_policy_id",
            ));
        }

        let mut seen_events = HashSet::new();
        for association in &self.function_associations {
            if association.kind == FunctionKind::Viewer && !association.event_type.is_viewer() {
                return Err(EdgeplaneError::validation_field(
                    format!(
                        "viewer function {} cannot attach to {:?}",
                        association.arn, association.event_type
                    ),
                    "function_associations",
                ));
            }
            if !seen_events.insert(association.event_type) {
                return Err(EdgeplaneError::validation_field(
                    format!("more than one function attached to {:?}", association.event_type),
                    "function_associations",
                ));
            }
        }

        Ok(())
    }
}

/// Group-wide parameters every member must agree on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedGroupParams {
    pub web_acl_id: Option<String>,
}

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(\*\.)?([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z][a-z0-9-]{0,61}[a-z0-9]$")
            .expect("hostname regex compilation failed")
    })
}

/// Check a DNS hostname, allowing one leading wildcard label
pub fn is_valid_hostname(host: &str) -> bool {
    host.len() <= 253 && hostname_pattern().is_match(host)
}

//! Structured route manifests
//!
//! A [`RouteManifest`] spells out every descriptor field directly, as YAML or
//! JSON.

use crate::domain::{
    DescriptorRef, FinalizerState, FunctionAssociation, FunctionEventType, FunctionKind,
    MatchKind, PathSpec, RouteDescriptor,
};
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPath {
    pub path: String,
    #[serde(default = "default_match_kind")]
    pub match_kind: MatchKind,
}

fn default_match_kind() -> MatchKind {
    MatchKind::Prefix
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFunction {
    pub event_type: FunctionEventType,
    pub arn: String,
    #[serde(default)]
    pub include_body: bool,
}

/// Structured route declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteManifest {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    pub group: String,
    /// Absent until the origin is provisioned
    #[serde(default)]
    pub origin_host: Option<String>,
    #[serde(default)]
    pub paths: Vec<ManifestPath>,
    /// Lightweight functions, viewer events only
    #[serde(default)]
    pub viewer_functions: Vec<ManifestFunction>,
    #[serde(default)]
    pub edge_functions: Vec<ManifestFunction>,
    #[serde(default)]
    pub origin_request_policy_id: Option<String>,
    #[serde(default)]
    pub cache_policy_id: Option<String>,
    /// Seconds
    #[serde(default)]
    pub origin_response_timeout: Option<u32>,
    #[serde(default)]
    pub alternate_domains: Vec<String>,
    #[serde(default)]
    pub web_acl_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub removed: bool,
    #[serde(default)]
    pub finalizer: FinalizerState,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn associations(
    kind: FunctionKind,
    functions: &[ManifestFunction],
) -> impl Iterator<Item = FunctionAssociation> + '_ {
    functions.iter().map(move |f| FunctionAssociation {
        kind,
        event_type: f.event_type,
        arn: f.arn.clone(),
        include_body: f.include_body,
    })
}

/// Normalize a manifest into a descriptor.
pub fn normalize(manifest: &RouteManifest) -> Result<RouteDescriptor> {
    let reference = DescriptorRef::new(&manifest.namespace, &manifest.name);
    let mut descriptor = RouteDescriptor::new(reference, manifest.group.trim());

    if let Some(host) = manifest.origin_host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
        descriptor = descriptor.with_origin(host);
    }

    descriptor.paths = manifest
        .paths
        .iter()
        .map(|p| PathSpec { pattern: p.path.clone(), match_kind: p.match_kind })
        .collect();
    descriptor.function_associations = associations(FunctionKind::Viewer, &manifest.viewer_functions)
        .chain(associations(FunctionKind::Edge, &manifest.edge_functions))
        .collect();
    descriptor.origin_request_policy_id = manifest.origin_request_policy_id.clone();
    descriptor.cache_policy_id = manifest.cache_policy_id.clone();
    descriptor.origin_response_timeout = manifest.origin_response_timeout;
    descriptor.alternate_domains = manifest.alternate_domains.clone();
    descriptor.web_acl_id = manifest.web_acl_id.clone().filter(|acl| !acl.trim().is_empty());
    descriptor.tags = manifest.tags.clone();
    descriptor.being_removed = manifest.removed;
    descriptor.finalizer = manifest.finalizer;

    Ok(descriptor)
}

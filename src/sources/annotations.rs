//! Annotation-based route sources
//!
//! An [`AnnotatedRoute`] mirrors an ingress-like object: HTTP rules plus a
//! flat map of string annotations. CDN settings live under the
//! `edgeplane.io/` prefix.

use crate::domain::{
    DescriptorRef, FinalizerState, FunctionAssociation, FunctionEventType, FunctionKind,
    MatchKind, PathSpec, RouteDescriptor,
};
use crate::errors::{EdgeplaneError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const ANNOTATION_PREFIX: &str = "edgeplane.io/";
pub const GROUP: &str = "edgeplane.io/group";
pub const ALTERNATE_DOMAIN_NAMES: &str = "edgeplane.io/alternate-domain-names";
pub const WEB_ACL_ID: &str = "edgeplane.io/web-acl-id";
pub const ORIGIN_REQUEST_POLICY: &str = "edgeplane.io/origin-request-policy";
pub const CACHE_POLICY: &str = "edgeplane.io/cache-policy";
pub const ORIGIN_RESPONSE_TIMEOUT: &str = "edgeplane.io/origin-response-timeout";
pub const VIEWER_FUNCTION_ARN: &str = "edgeplane.io/viewer-function-arn";
pub const EDGE_FUNCTION_ASSOCIATIONS: &str = "edgeplane.io/edge-function-associations";
pub const TAGS: &str = "edgeplane.io/tags";

/// Replaced by [`EDGE_FUNCTION_ASSOCIATIONS`]
pub const DEPRECATED_LAMBDA_EDGE_ARN: &str = "edgeplane.io/lambda-edge-arn";

/// Finalizer marking a route as managed by this engine
pub const FINALIZER: &str = "edgeplane.io/distribution-finalizer";

const KNOWN_ANNOTATIONS: [&str; 9] = [
    GROUP,
    ALTERNATE_DOMAIN_NAMES,
    WEB_ACL_ID,
    ORIGIN_REQUEST_POLICY,
    CACHE_POLICY,
    ORIGIN_RESPONSE_TIMEOUT,
    VIEWER_FUNCTION_ARN,
    EDGE_FUNCTION_ASSOCIATIONS,
    TAGS,
];

/// Path matching of an annotated rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PathType {
    Exact,
    #[default]
    Prefix,
    /// Treated as a prefix
    ImplementationSpecific,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePath {
    pub path: String,
    #[serde(default)]
    pub path_type: PathType,
}

/// Ingress-like route object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedRoute {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub paths: Vec<RulePath>,
    /// Set once the route's load balancer is provisioned
    #[serde(default)]
    pub load_balancer_hostname: Option<String>,
    #[serde(default)]
    pub deletion_requested: bool,
    #[serde(default)]
    pub finalizers: Vec<String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Edge function entry of the associations annotation (a JSON array).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeFunctionEntry {
    event_type: FunctionEventType,
    arn: String,
    #[serde(default)]
    include_body: bool,
}

impl AnnotatedRoute {
    fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
    }
}

/// Normalize an annotated route into a descriptor.
pub fn normalize(route: &AnnotatedRoute) -> Result<RouteDescriptor> {
    let reference = DescriptorRef::new(&route.namespace, &route.name);

    if route.annotations.contains_key(DEPRECATED_LAMBDA_EDGE_ARN) {
        return Err(EdgeplaneError::validation_field(
            format!(
                "{}: annotation '{}' is no longer supported, use '{}'",
                reference, DEPRECATED_LAMBDA_EDGE_ARN, EDGE_FUNCTION_ASSOCIATIONS
            ),
            DEPRECATED_LAMBDA_EDGE_ARN,
        ));
    }

    for key in route.annotations.keys() {
        if key.starts_with(ANNOTATION_PREFIX) && !KNOWN_ANNOTATIONS.contains(&key.as_str()) {
            debug!(descriptor = %reference, annotation = %key, "Ignoring unknown annotation");
        }
    }

    let group = route.annotation(GROUP).ok_or_else(|| {
        EdgeplaneError::validation_field(
            format!("{}: missing '{}' annotation", reference, GROUP),
            GROUP,
        )
    })?;

    let mut descriptor = RouteDescriptor::new(reference.clone(), group);

    if let Some(host) = route.load_balancer_hostname.as_deref().filter(|h| !h.trim().is_empty()) {
        descriptor = descriptor.with_origin(host.trim());
    }

    descriptor.paths = route
        .paths
        .iter()
        .map(|rule| PathSpec {
            pattern: rule.path.clone(),
            match_kind: match rule.path_type {
                PathType::Exact => MatchKind::Exact,
                PathType::Prefix | PathType::ImplementationSpecific => MatchKind::Prefix,
            },
        })
        .collect();

    descriptor.alternate_domains = split_list(route.annotation(ALTERNATE_DOMAIN_NAMES));
    descriptor.web_acl_id = route.annotation(WEB_ACL_ID).map(str::to_string);
    descriptor.origin_request_policy_id =
        route.annotation(ORIGIN_REQUEST_POLICY).map(str::to_string);
    descriptor.cache_policy_id = route.annotation(CACHE_POLICY).map(str::to_string);

    if let Some(raw) = route.annotation(ORIGIN_RESPONSE_TIMEOUT) {
        let timeout = raw.parse::<u32>().map_err(|_| {
            EdgeplaneError::validation_field(
                format!(
                    "{}: origin response timeout '{}' is not a number of seconds",
                    reference, raw
                ),
                ORIGIN_RESPONSE_TIMEOUT,
            )
        })?;
        descriptor.origin_response_timeout = Some(timeout);
    }

    if let Some(arn) = route.annotation(VIEWER_FUNCTION_ARN) {
        descriptor.function_associations.push(FunctionAssociation {
            kind: FunctionKind::Viewer,
            event_type: FunctionEventType::ViewerRequest,
            arn: arn.to_string(),
            include_body: false,
        });
    }

    if let Some(raw) = route.annotation(EDGE_FUNCTION_ASSOCIATIONS) {
        let entries: Vec<EdgeFunctionEntry> = serde_json::from_str(raw).map_err(|e| {
            EdgeplaneError::validation_field(
                format!("{}: invalid edge function associations: {}", reference, e),
                EDGE_FUNCTION_ASSOCIATIONS,
            )
        })?;
        descriptor.function_associations.extend(entries.into_iter().map(|entry| {
            FunctionAssociation {
                kind: FunctionKind::Edge,
                event_type: entry.event_type,
                arn: entry.arn,
                include_body: entry.include_body,
            }
        }));
    }

    descriptor.tags = parse_tags(&reference, route.annotation(TAGS))?;
    descriptor.being_removed = route.deletion_requested;
    descriptor.finalizer = if route.finalizers.iter().any(|f| f == FINALIZER) {
        FinalizerState::Managed
    } else {
        FinalizerState::Released
    };

    Ok(descriptor)
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
    })
    .unwrap_or_default()
}

/// `key=value` pairs separated by commas
fn parse_tags(reference: &DescriptorRef, raw: Option<&str>) -> Result<BTreeMap<String, String>> {
    let mut tags = BTreeMap::new();
    for pair in split_list(raw) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            EdgeplaneError::validation_field(
                format!("{}: tag '{}' is not of the form key=value", reference, pair),
                TAGS,
            )
        })?;
        tags.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(annotations: &[(&str, &str)]) -> AnnotatedRoute {
        AnnotatedRoute {
            namespace: "shop".to_string(),
            name: "web".to_string(),
            annotations: annotations
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            paths: vec![
                RulePath { path: "/".to_string(), path_type: PathType::Prefix },
                RulePath { path: "/health".to_string(), path_type: PathType::Exact },
            ],
            load_balancer_hostname: Some("lb-123.elb.example.net".to_string()),
            deletion_requested: false,
            finalizers: vec![],
        }
    }

    #[test]
    fn normalizes_full_route() {
        let descriptor = normalize(&route(&[
            (GROUP, "public"),
            (ALTERNATE_DOMAIN_NAMES, "www.example.com, api.example.com"),
            (WEB_ACL_ID, "acl-1"),
            (CACHE_POLICY, "cache-1"),
            (ORIGIN_REQUEST_POLICY, "origin-1"),
            (ORIGIN_RESPONSE_TIMEOUT, "45"),
            (VIEWER_FUNCTION_ARN, "arn:aws:cloudfront::1:function/rewrite"),
            (TAGS, "team=web, cost-center=42"),
        ]))
        .unwrap();

        assert_eq!(descriptor.reference.to_string(), "shop/web");
        assert_eq!(descriptor.group.as_str(), "public");
        assert!(descriptor.provisioned);
        assert_eq!(descriptor.origin_host, "lb-123.elb.example.net");
        assert_eq!(
            descriptor.paths,
            vec![PathSpec::prefix("/"), PathSpec::exact("/health")]
        );
        assert_eq!(descriptor.alternate_domains, vec!["www.example.com", "api.example.com"]);
        assert_eq!(descriptor.web_acl_id.as_deref(), Some("acl-1"));
        assert_eq!(descriptor.origin_response_timeout, Some(45));
        assert_eq!(descriptor.function_associations.len(), 1);
        assert_eq!(descriptor.tags.get("cost-center").map(String::as_str), Some("42"));
        descriptor.validate().unwrap();
    }

    #[test]
    fn unprovisioned_without_load_balancer() {
        let mut raw = route(&[(GROUP, "public")]);
        raw.load_balancer_hostname = None;
        let descriptor = normalize(&raw).unwrap();
        assert!(!descriptor.provisioned);
    }

    #[test]
    fn missing_group_rejected() {
        let err = normalize(&route(&[])).unwrap_err();
        assert!(matches!(err, EdgeplaneError::Validation { .. }));
    }

    #[test]
    fn deprecated_lambda_annotation_rejected() {
        let err = normalize(&route(&[
            (GROUP, "public"),
            (DEPRECATED_LAMBDA_EDGE_ARN, "arn:aws:lambda:us-east-1:1:function:f:1"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(EDGE_FUNCTION_ASSOCIATIONS));
    }

    #[test]
    fn edge_function_associations_parsed() {
        let descriptor = normalize(&route(&[
            (GROUP, "public"),
            (
                EDGE_FUNCTION_ASSOCIATIONS,
                r#"[{"eventType":"origin-request","arn":"arn:fn:1","includeBody":true}]"#,
            ),
        ]))
        .unwrap();
        let association = &descriptor.function_associations[0];
        assert_eq!(association.kind, FunctionKind::Edge);
        assert_eq!(association.event_type, FunctionEventType::OriginRequest);
        assert!(association.include_body);
    }

    #[test]
    fn malformed_values_rejected() {
        assert!(normalize(&route(&[(GROUP, "public"), (ORIGIN_RESPONSE_TIMEOUT, "soon")])).is_err());
        assert!(normalize(&route(&[(GROUP, "public"), (TAGS, "novalue")])).is_err());
        assert!(normalize(&route(&[(GROUP, "public"), (EDGE_FUNCTION_ASSOCIATIONS, "{")])).is_err());
    }

    #[test]
    fn finalizer_and_deletion_carried() {
        let mut raw = route(&[(GROUP, "public")]);
        raw.deletion_requested = true;
        raw.finalizers = vec![FINALIZER.to_string()];
        let descriptor = normalize(&raw).unwrap();
        assert!(descriptor.being_removed);
        assert_eq!(descriptor.finalizer, FinalizerState::Managed);
    }
}

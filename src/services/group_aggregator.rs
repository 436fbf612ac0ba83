//! Group aggregation
//!
//! Collects the descriptors that make up one group and merges the parameters
//! every member has to agree on.

use crate::domain::{GroupName, RouteDescriptor, SharedGroupParams};
use crate::errors::{EdgeplaneError, Result};
use std::collections::BTreeSet;
use tracing::debug;

/// Members of one group plus their merged shared parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedGroup {
    pub group: GroupName,
    /// Participating descriptors, sorted by reference
    pub members: Vec<RouteDescriptor>,
    pub shared: SharedGroupParams,
}

impl AggregatedGroup {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Aggregate every provisioned, non-removed descriptor of `group`.
///
/// Members must agree on a single non-empty WebACL or omit it. Disagreement is
/// a conflict naming every value observed.
pub fn aggregate<'a>(
    group: &GroupName,
    descriptors: impl IntoIterator<Item = &'a RouteDescriptor>,
) -> Result<AggregatedGroup> {
    let mut members: Vec<RouteDescriptor> =
        descriptors.into_iter().filter(|d| d.is_member_of(group)).cloned().collect();
    members.sort_by(|a, b| a.reference.cmp(&b.reference));
    members.dedup_by(|a, b| a.reference == b.reference);

    let web_acls: BTreeSet<&str> = members
        .iter()
        .filter_map(|d| d.web_acl_id.as_deref())
        .filter(|acl| !acl.is_empty())
        .collect();

    if web_acls.len() > 1 {
        let observed = web_acls.into_iter().collect::<Vec<_>>().join(", ");
        return Err(EdgeplaneError::conflict(
            format!("descriptors of group '{}' declare different WebACLs: {}", group, observed),
            "web_acl",
        ));
    }

    let shared = SharedGroupParams { web_acl_id: web_acls.into_iter().next().map(str::to_string) };

    debug!(group = %group, members = members.len(), web_acl = ?shared.web_acl_id, "Group aggregated");

    Ok(AggregatedGroup { group: group.clone(), members, shared })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DescriptorRef, PathSpec};

    fn member(name: &str) -> RouteDescriptor {
        RouteDescriptor::new(DescriptorRef::new("default", name), "public")
            .with_origin(format!("{}.lb.example.net", name))
            .with_path(PathSpec::prefix("/"))
    }

    #[test]
    fn filters_by_membership() {
        let other_group = RouteDescriptor::new(DescriptorRef::new("default", "x"), "internal")
            .with_origin("x.lb.example.net");
        let unprovisioned = RouteDescriptor::new(DescriptorRef::new("default", "y"), "public");
        let removed = member("z").removed();
        let all = vec![member("b"), other_group, unprovisioned, removed, member("a")];

        let group = aggregate(&GroupName::new("public"), &all).unwrap();
        let names: Vec<&str> = group.members.iter().map(|d| d.reference.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(group.shared, SharedGroupParams::default());
    }

    #[test]
    fn differing_web_acls_conflict() {
        let all = vec![member("a").with_web_acl("acl-1"), member("b").with_web_acl("acl-2")];
        let err = aggregate(&GroupName::new("public"), &all).unwrap_err();
        match err {
            EdgeplaneError::Conflict { message, resource_type } => {
                assert_eq!(resource_type, "web_acl");
                assert!(message.contains("acl-1"));
                assert!(message.contains("acl-2"));
            }
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn empty_and_valued_web_acl_adopts_value() {
        let all = vec![member("a"), member("b").with_web_acl("acl-1")];
        let group = aggregate(&GroupName::new("public"), &all).unwrap();
        assert_eq!(group.shared.web_acl_id.as_deref(), Some("acl-1"));
    }

    #[test]
    fn same_web_acl_everywhere_is_fine() {
        let all = vec![member("a").with_web_acl("acl-1"), member("b").with_web_acl("acl-1")];
        let group = aggregate(&GroupName::new("public"), &all).unwrap();
        assert_eq!(group.shared.web_acl_id.as_deref(), Some("acl-1"));
    }

    #[test]
    fn empty_string_web_acl_is_omitted() {
        let all = vec![member("a").with_web_acl(""), member("b").with_web_acl("acl-1")];
        let group = aggregate(&GroupName::new("public"), &all).unwrap();
        assert_eq!(group.shared.web_acl_id.as_deref(), Some("acl-1"));
    }

    #[test]
    fn no_members_is_empty_group() {
        let group = aggregate(&GroupName::new("public"), &[]).unwrap();
        assert!(group.is_empty());
    }
}

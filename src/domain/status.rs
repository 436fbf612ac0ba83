//! Persisted reconciliation bookkeeping
//!
//! One [`ReconciliationStatus`] exists per group. It is created on the first
//! cycle that reaches the bookkeeping step, rewritten on every cycle, and
//! deleted once the group converges to an empty model.

use crate::domain::{DescriptorRef, DistributionId, DistributionIdentity, GroupName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationStatus {
    pub group: GroupName,
    pub distribution_id: Option<DistributionId>,
    pub arn: Option<String>,
    pub address: Option<String>,
    /// Descriptor refs contributing to the group, with their last sync outcome
    #[serde(default)]
    pub descriptors: BTreeMap<DescriptorRef, bool>,
    /// Alias domains this system currently owns
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    pub last_reconciled_at: Option<DateTime<Utc>>,
}

impl ReconciliationStatus {
    pub fn new(group: GroupName) -> Self {
        Self {
            group,
            distribution_id: None,
            arn: None,
            address: None,
            descriptors: BTreeMap::new(),
            aliases: BTreeSet::new(),
            last_reconciled_at: None,
        }
    }

    /// Backend identity recorded by a previous cycle
    pub fn identity(&self) -> Option<DistributionIdentity> {
        let id = self.distribution_id.clone()?;
        Some(DistributionIdentity {
            id,
            arn: self.arn.clone().unwrap_or_default(),
            address: self.address.clone(),
        })
    }

    pub fn set_identity(&mut self, identity: Option<&DistributionIdentity>) {
        self.distribution_id = identity.map(|i| i.id.clone());
        self.arn = identity.map(|i| i.arn.clone());
        self.address = identity.and_then(|i| i.address.clone());
    }

    pub fn record_sync(&mut self, reference: &DescriptorRef, synced: bool) {
        self.descriptors.insert(reference.clone(), synced);
    }

    pub fn forget(&mut self, reference: &DescriptorRef) {
        self.descriptors.remove(reference);
    }

    pub fn is_synced(&self, reference: &DescriptorRef) -> Option<bool> {
        self.descriptors.get(reference).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips_through_status() {
        let mut status = ReconciliationStatus::new(GroupName::new("public"));
        assert!(status.identity().is_none());

        let identity = DistributionIdentity {
            id: DistributionId::new("E1"),
            arn: "arn:aws:cloudfront::1:distribution/E1".to_string(),
            address: Some("d1.cdn.example".to_string()),
        };
        status.set_identity(Some(&identity));
        assert_eq!(status.identity(), Some(identity));

        status.set_identity(None);
        assert!(status.distribution_id.is_none());
        assert!(status.address.is_none());
    }

    #[test]
    fn sync_flags_per_descriptor() {
        let mut status = ReconciliationStatus::new(GroupName::new("public"));
        let web = DescriptorRef::new("default", "web");
        status.record_sync(&web, false);
        assert_eq!(status.is_synced(&web), Some(false));
        status.record_sync(&web, true);
        assert_eq!(status.is_synced(&web), Some(true));
        status.forget(&web);
        assert_eq!(status.is_synced(&web), None);
    }
}

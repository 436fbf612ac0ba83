//! In-memory repository implementations
//!
//! Back the `simulate` CLI command and the test suites. Each store keeps a log
//! of mutating calls and supports failure injection so partial-failure paths
//! can be exercised without real backends.

use crate::domain::{
    Certificate, ChangeAction, ChangeBatch, DescriptorRef, DistributionId, DistributionIdentity,
    DistributionModel, Event, FinalizerState, GroupName, ReconciliationStatus, RecordSet,
    RecordType, RouteDescriptor,
};
use crate::errors::{Backend, EdgeplaneError, Result};
use crate::storage::repository::{
    CertificateFilter, CertificateRepository, DescriptorRepository, DistributionRepository,
    DnsRecordRepository, EventRecorder, StatusRepository,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

/// Distribution store keyed by group.
#[derive(Debug, Default)]
pub struct InMemoryDistributionRepository {
    distributions: RwLock<BTreeMap<GroupName, DistributionModel>>,
    calls: RwLock<Vec<String>>,
    failing: RwLock<HashSet<String>>,
    next_id: RwLock<u64>,
}

impl InMemoryDistributionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `operation` (create/update/delete) fail
    pub async fn fail_on(&self, operation: &str) {
        self.failing.write().await.insert(operation.to_string());
    }

    pub async fn clear_failures(&self) {
        self.failing.write().await.clear();
    }

    /// Mutating calls issued so far, e.g. `["create:public", "update:public"]`
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    pub async fn get(&self, group: &GroupName) -> Option<DistributionModel> {
        self.distributions.read().await.get(group).cloned()
    }

    async fn begin(&self, operation: &str, group: &GroupName) -> Result<()> {
        self.calls.write().await.push(format!("{}:{}", operation, group));
        if self.failing.read().await.contains(operation) {
            return Err(EdgeplaneError::backend(
                Backend::Distribution,
                operation,
                "injected failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DistributionRepository for InMemoryDistributionRepository {
    async fn create(&self, model: &DistributionModel) -> Result<DistributionModel> {
        self.begin("create", &model.group).await?;

        let mut next_id = self.next_id.write().await;
        *next_id += 1;
        let id = format!("E{:012}", *next_id);
        let identity = DistributionIdentity {
            arn: format!("arn:aws:cloudfront::000000000000:distribution/{}", id),
            address: Some(format!("{}.cdn.example.net", id.to_lowercase())),
            id: DistributionId::new(id),
        };

        let created = model.clone().with_identity(Some(identity));
        self.distributions.write().await.insert(model.group.clone(), created.clone());
        Ok(created)
    }

    async fn update(&self, model: &DistributionModel) -> Result<DistributionModel> {
        self.begin("update", &model.group).await?;

        let requested = model.identity.as_ref().ok_or_else(|| {
            EdgeplaneError::backend(Backend::Distribution, "update", "model carries no identity")
        })?;

        let mut distributions = self.distributions.write().await;
        let existing = distributions
            .values()
            .find(|d| d.identity.as_ref().map(|i| &i.id) == Some(&requested.id))
            .and_then(|d| d.identity.clone())
            .ok_or_else(|| {
                EdgeplaneError::backend(
                    Backend::Distribution,
                    "update",
                    format!("distribution {} does not exist", requested.id),
                )
            })?;

        let updated = model.clone().with_identity(Some(existing));
        distributions.insert(model.group.clone(), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, model: &DistributionModel) -> Result<()> {
        self.begin("delete", &model.group).await?;
        self.distributions.write().await.remove(&model.group);
        Ok(())
    }

    async fn arn_by_group(&self, group: &GroupName) -> Result<String> {
        self.distributions
            .read()
            .await
            .get(group)
            .and_then(|d| d.identity.as_ref().map(|i| i.arn.clone()))
            .ok_or_else(|| EdgeplaneError::not_found("distribution", group.as_str()))
    }
}

/// Fixed certificate directory.
#[derive(Debug, Default)]
pub struct InMemoryCertificateRepository {
    certificates: Vec<Certificate>,
}

impl InMemoryCertificateRepository {
    pub fn new(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }
}

#[async_trait]
impl CertificateRepository for InMemoryCertificateRepository {
    async fn find_by_filter(&self, predicate: CertificateFilter<'_>) -> Result<Vec<Certificate>> {
        Ok(self.certificates.iter().filter(|c| predicate(*c)).cloned().collect())
    }
}

/// Single hosted zone.
#[derive(Debug, Default)]
pub struct InMemoryDnsRepository {
    records: RwLock<BTreeMap<(String, RecordType), RecordSet>>,
    batches: RwLock<Vec<ChangeBatch>>,
    failing_names: RwLock<HashSet<String>>,
}

impl InMemoryDnsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without going through `apply`
    pub async fn insert(&self, record: RecordSet) {
        self.records.write().await.insert((record.name.clone(), record.record_type), record);
    }

    pub async fn record(&self, name: &str, record_type: RecordType) -> Option<RecordSet> {
        self.records.read().await.get(&(name.to_string(), record_type)).cloned()
    }

    /// Batches applied so far
    pub async fn batches(&self) -> Vec<ChangeBatch> {
        self.batches.read().await.clone()
    }

    /// Reject every batch touching `name`
    pub async fn fail_on(&self, name: &str) {
        self.failing_names.write().await.insert(name.to_string());
    }
}

#[async_trait]
impl DnsRecordRepository for InMemoryDnsRepository {
    async fn list_record_sets(&self, name: &str) -> Result<Vec<RecordSet>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.name == name)
            .cloned()
            .collect())
    }

    async fn apply(&self, batch: ChangeBatch) -> Result<()> {
        let failing = self.failing_names.read().await;
        if let Some(change) = batch.iter().find(|c| failing.contains(&c.record.name)) {
            return Err(EdgeplaneError::backend(
                Backend::Dns,
                "apply",
                format!("injected failure for {}", change.record.name),
            ));
        }

        let mut records = self.records.write().await;
        for change in &batch {
            let key = (change.record.name.clone(), change.record.record_type);
            if change.action == ChangeAction::Delete && !records.contains_key(&key) {
                return Err(EdgeplaneError::backend(
                    Backend::Dns,
                    "apply",
                    format!("{} record for {} does not exist", key.1, key.0),
                ));
            }
        }

        for change in &batch {
            let key = (change.record.name.clone(), change.record.record_type);
            match change.action {
                ChangeAction::Upsert => {
                    records.insert(key, change.record.clone());
                }
                ChangeAction::Delete => {
                    records.remove(&key);
                }
            }
        }

        self.batches.write().await.push(batch);
        Ok(())
    }
}

/// Status records keyed by group.
#[derive(Debug, Default)]
pub struct InMemoryStatusRepository {
    statuses: RwLock<BTreeMap<GroupName, ReconciliationStatus>>,
}

impl InMemoryStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<ReconciliationStatus> {
        self.statuses.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl StatusRepository for InMemoryStatusRepository {
    async fn get(&self, group: &GroupName) -> Result<Option<ReconciliationStatus>> {
        Ok(self.statuses.read().await.get(group).cloned())
    }

    async fn create(&self, status: &ReconciliationStatus) -> Result<()> {
        let mut statuses = self.statuses.write().await;
        if statuses.contains_key(&status.group) {
            return Err(EdgeplaneError::backend(
                Backend::Status,
                "create",
                format!("status for group '{}' already exists", status.group),
            ));
        }
        statuses.insert(status.group.clone(), status.clone());
        Ok(())
    }

    async fn update(&self, status: &ReconciliationStatus) -> Result<()> {
        let mut statuses = self.statuses.write().await;
        match statuses.get_mut(&status.group) {
            Some(existing) => {
                *existing = status.clone();
                Ok(())
            }
            None => Err(EdgeplaneError::not_found("status", status.group.as_str())),
        }
    }

    async fn delete(&self, group: &GroupName) -> Result<()> {
        self.statuses.write().await.remove(group);
        Ok(())
    }
}

/// Descriptor source backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryDescriptorRepository {
    descriptors: RwLock<BTreeMap<DescriptorRef, RouteDescriptor>>,
}

impl InMemoryDescriptorRepository {
    pub fn new(descriptors: impl IntoIterator<Item = RouteDescriptor>) -> Self {
        let descriptors = descriptors.into_iter().map(|d| (d.reference.clone(), d)).collect();
        Self { descriptors: RwLock::new(descriptors) }
    }

    pub async fn put(&self, descriptor: RouteDescriptor) {
        self.descriptors.write().await.insert(descriptor.reference.clone(), descriptor);
    }

    pub async fn remove(&self, reference: &DescriptorRef) {
        self.descriptors.write().await.remove(reference);
    }

    pub async fn get(&self, reference: &DescriptorRef) -> Option<RouteDescriptor> {
        self.descriptors.read().await.get(reference).cloned()
    }
}

#[async_trait]
impl DescriptorRepository for InMemoryDescriptorRepository {
    async fn list(&self) -> Result<Vec<RouteDescriptor>> {
        Ok(self.descriptors.read().await.values().cloned().collect())
    }

    async fn set_finalizer(&self, reference: &DescriptorRef, state: FinalizerState) -> Result<()> {
        match self.descriptors.write().await.get_mut(reference) {
            Some(descriptor) => {
                descriptor.finalizer = state;
                Ok(())
            }
            None => Err(EdgeplaneError::not_found("descriptor", reference.to_string())),
        }
    }
}

/// Collects events in publication order.
#[derive(Debug, Default)]
pub struct InMemoryEventRecorder {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventRecorder for InMemoryEventRecorder {
    async fn publish(&self, event: Event) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Origin, RecordChange};

    fn model(group: &str) -> DistributionModel {
        DistributionModel {
            group: GroupName::new(group),
            description: String::new(),
            default_origin: Origin::new("default.origin.invalid"),
            origins: vec![Origin::new("lb.example.net")],
            alternate_domains: vec![],
            tls: None,
            web_acl_id: None,
            tags: BTreeMap::new(),
            logging: None,
            ipv6_enabled: false,
            identity: None,
        }
    }

    #[tokio::test]
    async fn distribution_lifecycle() {
        let repo = InMemoryDistributionRepository::new();
        let group = GroupName::new("public");
        assert!(repo.arn_by_group(&group).await.unwrap_err().is_not_found());

        let created = repo.create(&model("public")).await.unwrap();
        let identity = created.identity.clone().unwrap();
        assert_eq!(repo.arn_by_group(&group).await.unwrap(), identity.arn);
        assert!(identity.address.is_some());

        let updated = repo.update(&created).await.unwrap();
        assert_eq!(updated.identity, Some(identity));

        repo.delete(&updated).await.unwrap();
        assert!(repo.get(&group).await.is_none());
        assert_eq!(repo.calls().await, vec!["create:public", "update:public", "delete:public"]);
    }

    #[tokio::test]
    async fn injected_distribution_failure() {
        let repo = InMemoryDistributionRepository::new();
        repo.fail_on("create").await;
        let err = repo.create(&model("public")).await.unwrap_err();
        assert!(matches!(err, EdgeplaneError::Backend { backend: Backend::Distribution, .. }));
    }

    #[tokio::test]
    async fn dns_batch_is_atomic() {
        let repo = InMemoryDnsRepository::new();
        let batch = vec![
            RecordChange {
                action: ChangeAction::Upsert,
                record: RecordSet::txt("www.example.com", vec!["token".to_string()]),
            },
            RecordChange {
                action: ChangeAction::Delete,
                record: RecordSet::alias("www.example.com", RecordType::A, "d.example.net"),
            },
        ];
        assert!(repo.apply(batch).await.is_err());
        assert!(repo.record("www.example.com", RecordType::Txt).await.is_none());
        assert!(repo.batches().await.is_empty());
    }

    #[tokio::test]
    async fn status_create_then_update() {
        let repo = InMemoryStatusRepository::new();
        let mut status = ReconciliationStatus::new(GroupName::new("public"));
        assert!(repo.update(&status).await.unwrap_err().is_not_found());
        repo.create(&status).await.unwrap();
        assert!(repo.create(&status).await.is_err());

        status.aliases.insert("www.example.com".to_string());
        repo.update(&status).await.unwrap();
        assert_eq!(repo.get(&status.group).await.unwrap(), Some(status.clone()));

        repo.delete(&status.group).await.unwrap();
        assert_eq!(repo.get(&status.group).await.unwrap(), None);
    }
}

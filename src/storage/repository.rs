//! Repository traits for the remote stores the engine converges.
//!
//! Wire-level SDK calls live behind these traits. Implementations must be
//! `Send + Sync` so one reconciler can serve concurrent cycles for distinct
//! groups, and must honor backend-side optimistic checks (resource version /
//! if-match on the distribution) since the engine takes no locks.

use crate::domain::{
    AliasSet, Certificate, ChangeBatch, DescriptorRef, DistributionModel, Event, FinalizerState,
    GroupName, ReconciliationStatus, RecordSet, RouteDescriptor,
};
use crate::errors::{EdgeplaneError, Result};
use async_trait::async_trait;

/// CDN control plane.
#[async_trait]
pub trait DistributionRepository: Send + Sync {
    /// Create the distribution; the returned model carries the new identity.
    async fn create(&self, model: &DistributionModel) -> Result<DistributionModel>;

    /// Update an existing distribution in place.
    async fn update(&self, model: &DistributionModel) -> Result<DistributionModel>;

    /// Delete the distribution identified by the model.
    async fn delete(&self, model: &DistributionModel) -> Result<()>;

    /// ARN of the group's distribution.
    ///
    /// # Errors
    ///
    /// - [`EdgeplaneError::NotFound`] if the group has no distribution yet
    async fn arn_by_group(&self, group: &GroupName) -> Result<String>;
}

/// Predicate passed to the certificate directory.
pub type CertificateFilter<'a> = &'a (dyn Fn(&Certificate) -> bool + Send + Sync);

/// Certificate directory.
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// Certificates accepted by `filter`, in directory order.
    async fn find_by_filter(&self, filter: CertificateFilter<'_>) -> Result<Vec<Certificate>>;
}

/// Raw DNS control plane for one hosted zone.
#[async_trait]
pub trait DnsRecordRepository: Send + Sync {
    /// Every record set stored at `name`.
    async fn list_record_sets(&self, name: &str) -> Result<Vec<RecordSet>>;

    /// Apply all changes atomically.
    async fn apply(&self, batch: ChangeBatch) -> Result<()>;
}

/// Outcome of converging an alias set; entries fail independently.
#[derive(Debug, Default)]
pub struct AliasSyncReport {
    /// Domains whose changes were applied
    pub succeeded: Vec<String>,
    pub errors: Vec<EdgeplaneError>,
}

impl AliasSyncReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Alias records for distributions.
#[async_trait]
pub trait AliasRepository: Send + Sync {
    async fn upsert(&self, aliases: &AliasSet) -> AliasSyncReport;

    async fn delete(&self, aliases: &AliasSet) -> AliasSyncReport;
}

/// Persisted per-group bookkeeping.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn get(&self, group: &GroupName) -> Result<Option<ReconciliationStatus>>;

    async fn create(&self, status: &ReconciliationStatus) -> Result<()>;

    async fn update(&self, status: &ReconciliationStatus) -> Result<()>;

    async fn delete(&self, group: &GroupName) -> Result<()>;
}

/// Source of route descriptors.
#[async_trait]
pub trait DescriptorRepository: Send + Sync {
    /// Every known descriptor, across all groups.
    async fn list(&self) -> Result<Vec<RouteDescriptor>>;

    /// Persist the finalizer state of one descriptor.
    async fn set_finalizer(&self, reference: &DescriptorRef, state: FinalizerState) -> Result<()>;
}

/// Sink for operator-facing events.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn publish(&self, event: Event) -> Result<()>;
}

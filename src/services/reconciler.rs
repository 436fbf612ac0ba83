//! # Convergence reconciler
//!
//! Drives one reconciliation cycle for the group of a triggering descriptor:
//!
//! 1. validate the descriptor
//! 2. aggregate its group
//! 3. build the desired distribution model
//! 4. refuse to create a distribution when creation is disabled
//! 5. load (or start) the group's status record
//! 6. converge the distribution
//! 7. converge alias records
//! 8. keep or release the descriptor's finalizer
//! 9. forget a removed descriptor
//! 10. persist or delete the status record
//! 11. report one result, with events on the descriptor and the status
//!
//! Steps 1 to 4 stop the cycle on the first error. Steps 6 and 7 talk to
//! independent backends; a failure in one is recorded and the other still runs.
//!
//! No locks are taken. Concurrent cycles for the same group race on the status
//! record and the last writer wins; the next cycle recomputes everything.

use crate::config::EngineConfig;
use crate::domain::{
    AliasSet, DistributionIdentity, DistributionModel, Event, EventTarget, FinalizerState,
    GroupName, ReconciliationStatus, RouteDescriptor,
};
use crate::errors::{Backend, EdgeplaneError, Result};
use crate::observability::ReconcileMetrics;
use crate::services::distribution_builder::DistributionModelBuilder;
use crate::services::group_aggregator::aggregate;
use crate::storage::{
    AliasRepository, CertificateRepository, DescriptorRepository, DistributionRepository,
    EventRecorder, StatusRepository,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Event reason published when a cycle converges
pub const REASON_RECONCILED: &str = "Reconciled";

/// Backends a reconciler converges.
#[derive(Clone)]
pub struct ReconcilerBackends {
    pub distributions: Arc<dyn DistributionRepository>,
    pub aliases: Arc<dyn AliasRepository>,
    pub certificates: Arc<dyn CertificateRepository>,
    pub statuses: Arc<dyn StatusRepository>,
    pub descriptors: Arc<dyn DescriptorRepository>,
    pub events: Arc<dyn EventRecorder>,
}

/// Where a failed cycle reports its error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureScope {
    DescriptorOnly,
    DescriptorAndStatus,
}

struct CycleFailure {
    error: EdgeplaneError,
    scope: FailureScope,
}

impl From<EdgeplaneError> for CycleFailure {
    fn from(error: EdgeplaneError) -> Self {
        Self { error, scope: FailureScope::DescriptorAndStatus }
    }
}

/// Outcome of the distribution step
struct DistributionSync {
    identity: Option<DistributionIdentity>,
    error: Option<EdgeplaneError>,
}

/// Reconciles route descriptors into one distribution per group.
pub struct ConvergenceReconciler {
    config: EngineConfig,
    backends: ReconcilerBackends,
    metrics: ReconcileMetrics,
}

impl ConvergenceReconciler {
    pub fn new(config: EngineConfig, backends: ReconcilerBackends) -> Self {
        Self { config, backends, metrics: ReconcileMetrics::new() }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one reconciliation cycle for the group of `descriptor`.
    ///
    /// Idempotent; safe to call repeatedly and concurrently for distinct groups.
    #[instrument(
        skip(self, descriptor),
        fields(group = %descriptor.group, descriptor = %descriptor.reference),
        name = "reconcile"
    )]
    pub async fn reconcile(&self, descriptor: &RouteDescriptor) -> Result<()> {
        let started = Instant::now();
        let outcome = self.run_cycle(descriptor).await;
        let elapsed = started.elapsed().as_secs_f64();

        self.metrics.record_cycle(descriptor.group.as_str(), outcome.is_ok(), elapsed);

        match outcome {
            Ok(()) => {
                info!(duration_seconds = elapsed, "Reconciliation converged");
                let message = format!("group '{}' converged", descriptor.group);
                self.publish(Event::normal(
                    EventTarget::Descriptor(descriptor.reference.clone()),
                    REASON_RECONCILED,
                    message.clone(),
                ))
                .await;
                self.publish(Event::normal(
                    EventTarget::Status(descriptor.group.clone()),
                    REASON_RECONCILED,
                    message,
                ))
                .await;
                Ok(())
            }
            Err(CycleFailure { error, scope }) => {
                warn!(
                    error = %error,
                    reason = error.reason(),
                    retryable = !error.is_fatal(),
                    "Reconciliation failed"
                );
                self.publish(Event::warning(
                    EventTarget::Descriptor(descriptor.reference.clone()),
                    error.reason(),
                    error.to_string(),
                ))
                .await;
                if scope == FailureScope::DescriptorAndStatus {
                    self.publish(Event::warning(
                        EventTarget::Status(descriptor.group.clone()),
                        error.reason(),
                        error.to_string(),
                    ))
                    .await;
                }
                Err(error)
            }
        }
    }

    async fn run_cycle(
        &self,
        descriptor: &RouteDescriptor,
    ) -> std::result::Result<(), CycleFailure> {
        // 1. validate
        descriptor.validate()?;

        // 2. aggregate; the triggering copy is the freshest one
        let mut listed = self.backends.descriptors.list().await?;
        listed.retain(|d| d.reference != descriptor.reference);
        listed.push(descriptor.clone());
        let group = aggregate(&descriptor.group, &listed)?;

        // 3. build
        let persisted = self.backends.statuses.get(&descriptor.group).await?;
        let identity = self.existing_identity(&descriptor.group, persisted.as_ref()).await?;
        let model =
            DistributionModelBuilder::new(&self.config, self.backends.certificates.as_ref())
                .build(&group, identity)
                .await?;

        // 4. creation guard
        if !model.is_empty() && !model.exists() && !self.config.creation_enabled {
            return Err(CycleFailure {
                error: EdgeplaneError::validation(format!(
                    "group '{}' has no distribution and distribution creation is disabled",
                    descriptor.group
                )),
                scope: FailureScope::DescriptorOnly,
            });
        }

        // 5. load or start the status record
        let status_is_new = persisted.is_none();
        let mut status =
            persisted.unwrap_or_else(|| ReconciliationStatus::new(descriptor.group.clone()));

        let mut errors: Vec<EdgeplaneError> = Vec::new();

        // 6. distribution
        let distribution = self.sync_distribution(&model).await;
        status.set_identity(distribution.identity.as_ref());
        let distribution_synced = distribution.error.is_none();
        errors.extend(distribution.error);

        // 7. aliases
        let mut aliases_synced = true;
        if self.config.alias.enabled {
            let alias_errors = self.sync_aliases(&model, &mut status).await;
            aliases_synced = alias_errors.is_empty();
            errors.extend(alias_errors);
        }

        status.record_sync(&descriptor.reference, distribution_synced && aliases_synced);

        // 8. finalizer
        let finalizer = if !errors.is_empty() || !descriptor.being_removed {
            FinalizerState::Managed
        } else {
            FinalizerState::Released
        };
        if finalizer != descriptor.finalizer {
            debug!(finalizer = ?finalizer, "Updating descriptor finalizer");
            if let Err(error) =
                self.backends.descriptors.set_finalizer(&descriptor.reference, finalizer).await
            {
                errors.push(error);
            }
        }

        // 9. forget removed descriptors
        if descriptor.being_removed {
            status.forget(&descriptor.reference);
        }

        // 10. persist bookkeeping
        status.last_reconciled_at = Some(Utc::now());
        let clean = errors.is_empty();
        if let Err(error) = self.persist_status(&model, status, status_is_new, clean).await {
            errors.push(error);
        }

        // 11. report
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EdgeplaneError::combine(errors).into())
        }
    }

    /// Identity recorded in the status, else looked up by group.
    async fn existing_identity(
        &self,
        group: &GroupName,
        status: Option<&ReconciliationStatus>,
    ) -> Result<Option<DistributionIdentity>> {
        if let Some(identity) = status.and_then(ReconciliationStatus::identity) {
            return Ok(Some(identity));
        }

        match self.backends.distributions.arn_by_group(group).await {
            Ok(arn) => {
                let identity = DistributionIdentity::from_arn(arn.clone()).ok_or_else(|| {
                    EdgeplaneError::validation(format!("malformed distribution ARN '{}'", arn))
                })?;
                debug!(distribution_id = %identity.id, "Recovered distribution identity by group");
                Ok(Some(identity))
            }
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    #[instrument(skip(self, model), fields(origins = model.origins.len(), exists = model.exists()), name = "sync_distribution")]
    async fn sync_distribution(&self, model: &DistributionModel) -> DistributionSync {
        if model.is_empty() {
            if !model.exists() {
                debug!("No distribution to converge");
                return DistributionSync { identity: None, error: None };
            }
            if !self.config.deletion_enabled {
                info!("Group is empty but distribution deletion is disabled");
                return DistributionSync { identity: model.identity.clone(), error: None };
            }

            let result = self.backends.distributions.delete(model).await;
            self.metrics.record_distribution_operation("delete", result.is_ok());
            return match result {
                Ok(()) => {
                    info!("Distribution deleted");
                    DistributionSync { identity: None, error: None }
                }
                Err(error) => {
                    warn!(error = %error, "Distribution delete failed");
                    DistributionSync { identity: model.identity.clone(), error: Some(error) }
                }
            };
        }

        let (operation, result) = if model.exists() {
            ("update", self.backends.distributions.update(model).await)
        } else {
            ("create", self.backends.distributions.create(model).await)
        };
        self.metrics.record_distribution_operation(operation, result.is_ok());

        match result {
            Ok(synced) => {
                info!(
                    operation,
                    distribution_id = ?synced.identity.as_ref().map(|i| i.id.as_str()),
                    "Distribution synced"
                );
                DistributionSync {
                    identity: synced.identity.or_else(|| model.identity.clone()),
                    error: None,
                }
            }
            Err(error) => {
                warn!(operation, error = %error, "Distribution sync failed");
                DistributionSync { identity: model.identity.clone(), error: Some(error) }
            }
        }
    }

    /// Upsert desired aliases and delete the ones no longer wanted. The status
    /// keeps only domains whose changes were applied.
    #[instrument(skip(self, model, status), name = "sync_aliases")]
    async fn sync_aliases(
        &self,
        model: &DistributionModel,
        status: &mut ReconciliationStatus,
    ) -> Vec<EdgeplaneError> {
        let mut errors = Vec::new();
        let desired: BTreeSet<String> = model.alternate_domains.iter().cloned().collect();
        let to_delete = AliasSet::to_delete(&status.aliases, &desired);
        let mut owned = status.aliases.clone();

        if !desired.is_empty() {
            match status.address.clone() {
                Some(address) => {
                    let upserts = AliasSet::desired(address, &desired, model.ipv6_enabled);
                    let report = self.backends.aliases.upsert(&upserts).await;
                    self.metrics.record_alias_changes(
                        "upsert",
                        report.succeeded.len(),
                        report.errors.len(),
                    );
                    owned.extend(report.succeeded);
                    errors.extend(report.errors);
                }
                None => {
                    warn!("Distribution has no address yet; alias upsert skipped");
                    errors.push(EdgeplaneError::backend(
                        Backend::Distribution,
                        "resolve_address",
                        format!(
                            "distribution for group '{}' reports no address; aliases {:?} not upserted",
                            model.group, desired
                        ),
                    ));
                }
            }
        }

        if !to_delete.is_empty() {
            debug!(domains = ?to_delete.domains().collect::<Vec<_>>(), "Releasing alias domains");
            let report = self.backends.aliases.delete(&to_delete).await;
            self.metrics.record_alias_changes("delete", report.succeeded.len(), report.errors.len());
            for domain in &report.succeeded {
                owned.remove(domain);
            }
            errors.extend(report.errors);
        }

        status.aliases = owned;
        errors
    }

    async fn persist_status(
        &self,
        model: &DistributionModel,
        status: ReconciliationStatus,
        status_is_new: bool,
        clean: bool,
    ) -> Result<()> {
        if clean && model.is_empty() && self.config.deletion_enabled {
            if status_is_new {
                return Ok(());
            }
            self.backends.statuses.delete(&status.group).await?;
            info!("Status record deleted");
            return Ok(());
        }

        if status_is_new {
            self.backends.statuses.create(&status).await
        } else {
            self.backends.statuses.update(&status).await
        }
    }

    async fn publish(&self, event: Event) {
        let target = event.target.to_string();
        if let Err(error) = self.backends.events.publish(event).await {
            warn!(target = %target, error = %error, "Failed to publish event");
        }
    }
}

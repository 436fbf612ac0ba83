//! Shared fixtures for reconciler integration tests

#![allow(dead_code)]

use std::sync::Arc;

use edgeplane::domain::{DescriptorRef, PathSpec, RouteDescriptor};
use edgeplane::services::{AliasOwnershipProtocol, ConvergenceReconciler, ReconcilerBackends};
use edgeplane::storage::{
    InMemoryCertificateRepository, InMemoryDescriptorRepository, InMemoryDistributionRepository,
    InMemoryDnsRepository, InMemoryEventRecorder, InMemoryStatusRepository,
};
use edgeplane::EngineConfig;

/// In-memory backends wired into one reconciler
pub struct TestEngine {
    pub distributions: Arc<InMemoryDistributionRepository>,
    pub dns: Arc<InMemoryDnsRepository>,
    pub statuses: Arc<InMemoryStatusRepository>,
    pub descriptors: Arc<InMemoryDescriptorRepository>,
    pub events: Arc<InMemoryEventRecorder>,
    pub reconciler: ConvergenceReconciler,
}

impl TestEngine {
    pub fn new(config: EngineConfig, seed: Vec<RouteDescriptor>) -> Self {
        Self::with_certificates(config, seed, InMemoryCertificateRepository::new(vec![]))
    }

    pub fn with_certificates(
        config: EngineConfig,
        seed: Vec<RouteDescriptor>,
        certificates: InMemoryCertificateRepository,
    ) -> Self {
        let distributions = Arc::new(InMemoryDistributionRepository::new());
        let dns = Arc::new(InMemoryDnsRepository::new());
        let statuses = Arc::new(InMemoryStatusRepository::new());
        let descriptors = Arc::new(InMemoryDescriptorRepository::new(seed));
        let events = Arc::new(InMemoryEventRecorder::new());

        let backends = ReconcilerBackends {
            distributions: distributions.clone(),
            aliases: Arc::new(AliasOwnershipProtocol::new(
                dns.clone(),
                config.alias.ownership_token.clone(),
            )),
            certificates: Arc::new(certificates),
            statuses: statuses.clone(),
            descriptors: descriptors.clone(),
            events: events.clone(),
        };

        Self {
            distributions,
            dns,
            statuses,
            descriptors,
            events,
            reconciler: ConvergenceReconciler::new(config, backends),
        }
    }

    /// Store the descriptor, then reconcile it
    pub async fn apply(&self, descriptor: &RouteDescriptor) -> edgeplane::Result<()> {
        self.descriptors.put(descriptor.clone()).await;
        self.reconciler.reconcile(descriptor).await
    }
}

/// Provisioned descriptor in `group` serving `/` from `host`
pub fn route(name: &str, group: &str, host: &str) -> RouteDescriptor {
    RouteDescriptor::new(DescriptorRef::new("default", name), group)
        .with_origin(host)
        .with_path(PathSpec::prefix("/"))
}

pub fn config_with_aliases() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.alias.enabled = true;
    config
}

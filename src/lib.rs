//! # edgeplane
//!
//! Convergence engine that reconciles route descriptors, grouped by a logical
//! key, into one CDN distribution per group plus the DNS alias records that
//! point at it.
//!
//! ## Architecture
//!
//! ```text
//! sources → RouteDescriptor → GroupAggregator → DistributionModelBuilder
//!                                                     ↓
//!              StatusRepository ← ConvergenceReconciler → DistributionRepository
//!                                                     ↓
//!                                   AliasOwnershipProtocol → DnsRecordRepository
//! ```
//!
//! Backends are consumed through the async traits in [`storage`]; the engine
//! never talks to a wire protocol itself.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use edgeplane::services::{AliasOwnershipProtocol, ConvergenceReconciler, ReconcilerBackends};
//! use edgeplane::storage::*;
//! use edgeplane::{EngineConfig, Result};
//!
//! # async fn run(descriptor: edgeplane::domain::RouteDescriptor) -> Result<()> {
//! let config = EngineConfig::load(None)?;
//! let backends = ReconcilerBackends {
//!     distributions: Arc::new(InMemoryDistributionRepository::new()),
//!     aliases: Arc::new(AliasOwnershipProtocol::new(
//!         Arc::new(InMemoryDnsRepository::new()),
//!         config.alias.ownership_token.clone(),
//!     )),
//!     certificates: Arc::new(InMemoryCertificateRepository::new(vec![])),
//!     statuses: Arc::new(InMemoryStatusRepository::new()),
//!     descriptors: Arc::new(InMemoryDescriptorRepository::new(vec![descriptor.clone()])),
//!     events: Arc::new(InMemoryEventRecorder::new()),
//! };
//! ConvergenceReconciler::new(config, backends).reconcile(&descriptor).await
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod sources;
pub mod storage;

// Re-export commonly used types and traits
pub use config::EngineConfig;
pub use errors::{EdgeplaneError, Result};
pub use services::ConvergenceReconciler;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

//! Convergence services
//!
//! Path translation and ordering, group aggregation, certificate matching,
//! model building, the DNS ownership protocol and the reconciler that drives
//! them against the storage layer.

pub mod alias_ownership;
pub mod certificate_matcher;
pub mod distribution_builder;
pub mod group_aggregator;
pub mod path_pattern;
pub mod reconciler;
pub mod specificity;

pub use alias_ownership::AliasOwnershipProtocol;
pub use certificate_matcher::CertificateMatcher;
pub use distribution_builder::DistributionModelBuilder;
pub use group_aggregator::{aggregate, AggregatedGroup};
pub use reconciler::{ConvergenceReconciler, ReconcilerBackends};

//! Domain layer
//!
//! Pure domain entities for the convergence engine with no backend
//! dependencies. Descriptors go in, distribution models and alias sets come
//! out, and the status record ties cycles together.
//!
//! ## Module Organization
//!
//! - `id`: Type-safe identifiers with NewType pattern
//! - `descriptor`: Normalized route descriptors and their validation
//! - `distribution`: Desired distribution model (origins, behaviors, TLS)
//! - `alias`: Alias sets and DNS record vocabulary
//! - `certificate`: Certificate directory entries
//! - `status`: Persisted per-group reconciliation status
//! - `event`: Events surfaced to operators

pub mod alias;
pub mod certificate;
pub mod descriptor;
pub mod distribution;
pub mod event;
pub mod id;
pub mod status;

pub use alias::{
    AliasEntry, AliasSet, ChangeAction, ChangeBatch, RecordChange, RecordSet, RecordType,
};
pub use certificate::{Certificate, CertificateStatus};
pub use descriptor::{
    is_valid_hostname, FinalizerState, FunctionAssociation, FunctionEventType, FunctionKind,
    MatchKind, PathSpec, RouteDescriptor, SharedGroupParams,
};
pub use distribution::{
    Behavior, DistributionIdentity, DistributionModel, LoggingConfig, Origin, TlsConfig,
};
pub use event::{Event, EventKind, EventTarget};
pub use id::{DescriptorRef, DistributionId, GroupName};
pub use status::ReconciliationStatus;

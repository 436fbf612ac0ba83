//! # Storage Layer
//!
//! Repository traits for the three remote stores, the status store, the
//! descriptor source and the event sink, plus in-memory implementations.

pub mod memory;
pub mod repository;

pub use memory::{
    InMemoryCertificateRepository, InMemoryDescriptorRepository, InMemoryDistributionRepository,
    InMemoryDnsRepository, InMemoryEventRecorder, InMemoryStatusRepository,
};
pub use repository::{
    AliasRepository, AliasSyncReport, CertificateFilter, CertificateRepository,
    DescriptorRepository, DistributionRepository, DnsRecordRepository, EventRecorder,
    StatusRepository,
};

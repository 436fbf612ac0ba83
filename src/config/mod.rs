//! # Configuration Management
//!
//! Configuration for the edgeplane engine and binary.

pub mod settings;

pub use settings::{
    AccessLogSettings, AliasSettings, EngineConfig, ObservabilityConfig, TlsSettings,
};

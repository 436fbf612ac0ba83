//! # Error Handling
//!
//! Error handling for the edgeplane convergence engine.
//!
//! The taxonomy separates fatal, pre-backend failures (validation, conflicts,
//! model build) from backend failures that are recorded and aggregated
//! without aborting sibling steps. `NotFound` signals "doesn't exist yet" and
//! is never a failure on its own.

pub mod types;

pub use types::{Backend, EdgeplaneError, Result};

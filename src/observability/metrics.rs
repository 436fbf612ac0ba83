//! # Metrics Collection
//!
//! Reconciliation metrics recorded through the `metrics` facade. Without an
//! installed recorder every call is a no-op, so the engine never depends on an
//! exporter being present.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

pub const RECONCILE_TOTAL: &str = "edgeplane_reconcile_total";
pub const RECONCILE_DURATION: &str = "edgeplane_reconcile_duration_seconds";
pub const DISTRIBUTION_OPERATIONS: &str = "edgeplane_distribution_operations_total";
pub const ALIAS_CHANGES: &str = "edgeplane_alias_changes_total";

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(RECONCILE_TOTAL, Unit::Count, "Reconciliation cycles by result");
    describe_histogram!(RECONCILE_DURATION, Unit::Seconds, "Reconciliation cycle duration");
    describe_counter!(
        DISTRIBUTION_OPERATIONS,
        Unit::Count,
        "Distribution create/update/delete calls by outcome"
    );
    describe_counter!(ALIAS_CHANGES, Unit::Count, "Alias entries changed by operation and outcome");
}

/// Records reconciliation activity
#[derive(Debug, Clone, Default)]
pub struct ReconcileMetrics;

impl ReconcileMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Record the end of a reconciliation cycle
    pub fn record_cycle(&self, group: &str, success: bool, duration: f64) {
        let result = if success { "success" } else { "error" };
        let labels = [("group", group.to_string()), ("result", result.to_string())];
        counter!(RECONCILE_TOTAL, &labels).increment(1);
        histogram!(RECONCILE_DURATION, &[("group", group.to_string())]).record(duration);
    }

    /// Record a distribution backend call
    pub fn record_distribution_operation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        let labels = [("operation", operation.to_string()), ("status", status.to_string())];
        counter!(DISTRIBUTION_OPERATIONS, &labels).increment(1);
    }

    /// Record alias entries processed by the ownership protocol
    pub fn record_alias_changes(&self, operation: &str, succeeded: usize, failed: usize) {
        let ok = [("operation", operation.to_string()), ("status", "success".to_string())];
        counter!(ALIAS_CHANGES, &ok).increment(succeeded as u64);
        let err = [("operation", operation.to_string()), ("status", "error".to_string())];
        counter!(ALIAS_CHANGES, &err).increment(failed as u64);
    }
}

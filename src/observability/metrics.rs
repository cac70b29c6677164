//! Operation metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.

use std::time::Instant;

/// Records one storage operation.
///
/// Emits two metrics labelled by `backend`, `operation`, and `status`:
/// - `storage_operations_total`: counter
/// - `storage_operation_duration_ms`: histogram of latency
///
/// # Examples
///
/// ```
/// use std::time::Instant;
/// use userstore::observability::record_operation_metrics;
///
/// let start = Instant::now();
/// record_operation_metrics("table", "read", start, "success");
/// ```
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Returns the status label for a result.
pub const fn status_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}

//! Metrics collection and Prometheus export.
//!
//! Installs the global recorder and names the counters the service emits.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

use crate::models::DocumentKind;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Safe to call more than once; later calls reuse the first handle. When
/// another recorder is already installed the handle still renders, just
/// without our series.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already installed");
        }
        handle
    });
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_document_created(kind: DocumentKind) {
    metrics::counter!("invoice_documents_created_total", "kind" => kind.as_str()).increment(1);
}

/// `outcome` is one of `saved`, `skipped`, `failed`, `retried`.
pub fn record_autosave(outcome: &'static str) {
    metrics::counter!("invoice_autosave_total", "outcome" => outcome).increment(1);
}

pub fn record_store_error(operation: &'static str) {
    metrics::counter!("invoice_store_errors_total", "operation" => operation).increment(1);
}

/// Store query latency.
pub fn record_query(operation: &'static str, started: Instant) {
    metrics::histogram!("invoice_store_query_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

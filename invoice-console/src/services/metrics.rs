use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once per process.
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

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// `outcome`: created, rejected, transport, decode.
pub fn record_intent_request(outcome: &'static str) {
    counter!("payment_intent_requests_total", "outcome" => outcome).increment(1);
}

/// `outcome`: succeeded, provisional, requires_action, failed.
pub fn record_payment_outcome(outcome: &'static str) {
    counter!("payment_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_refund(outcome: &'static str) {
    counter!("refund_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_invalidation(reason: &'static str, keys: usize) {
    counter!("cache_invalidations_total", "reason" => reason).increment(keys as u64);
}

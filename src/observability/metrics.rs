//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `mailerlite_operator_reconciliations_total{kind}` - Total number of reconciliations
//! - `mailerlite_operator_reconciliation_errors_total{kind}` - Reconciliations returning an error
//! - `mailerlite_operator_reconciliation_duration_seconds{kind}` - Duration of reconciliations
//! - `mailerlite_operator_emails_sent_total{provider,outcome}` - Send attempts by outcome
//! - `mailerlite_operator_credential_verifications_total{provider,outcome}` - Credential checks by outcome
//! - `mailerlite_operator_provider_request_duration_seconds{provider,operation}` - Provider HTTP latency
//! - `mailerlite_operator_provider_retries_total{provider,operation}` - Transport retries
//! - `mailerlite_operator_requeues_total{reason}` - Requeues scheduled by the controller

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;
use std::time::Duration;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "mailerlite_operator_reconciliations_total",
            "Total number of reconciliations",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "mailerlite_operator_reconciliation_errors_total",
            "Total number of reconciliations that returned an error",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "mailerlite_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static EMAILS_SENT_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "mailerlite_operator_emails_sent_total",
            "Total number of email send attempts by provider and outcome",
        ),
        &["provider", "outcome"],
    )
    .expect("Failed to create EMAILS_SENT_TOTAL metric - this should never happen")
});

static CREDENTIAL_VERIFICATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "mailerlite_operator_credential_verifications_total",
            "Total number of provider credential verifications by provider and outcome",
        ),
        &["provider", "outcome"],
    )
    .expect("Failed to create CREDENTIAL_VERIFICATIONS_TOTAL metric - this should never happen")
});

static PROVIDER_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "mailerlite_operator_provider_request_duration_seconds",
            "Duration of provider HTTP requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["provider", "operation"],
    )
    .expect("Failed to create PROVIDER_REQUEST_DURATION metric - this should never happen")
});

static PROVIDER_RETRIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "mailerlite_operator_provider_retries_total",
            "Total number of provider requests retried after a transport failure",
        ),
        &["provider", "operation"],
    )
    .expect("Failed to create PROVIDER_RETRIES_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "mailerlite_operator_requeues_total",
            "Total number of requeues scheduled by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry served on `/metrics`
///
/// # Errors
/// Returns an error if a metric is registered twice
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(EMAILS_SENT_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CREDENTIAL_VERIFICATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_RETRIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: Duration) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

pub fn record_email_sent(provider: &str, outcome: &str) {
    EMAILS_SENT_TOTAL.with_label_values(&[provider, outcome]).inc();
}

pub fn record_credential_verification(provider: &str, outcome: &str) {
    CREDENTIAL_VERIFICATIONS_TOTAL
        .with_label_values(&[provider, outcome])
        .inc();
}

pub fn observe_provider_request(provider: &str, operation: &str, duration: Duration) {
    PROVIDER_REQUEST_DURATION
        .with_label_values(&[provider, operation])
        .observe(duration.as_secs_f64());
}

pub fn increment_provider_retries(provider: &str, operation: &str) {
    PROVIDER_RETRIES_TOTAL
        .with_label_values(&[provider, operation])
        .inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

/// Snapshot of every registered metric family
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate_per_label() {
        let before = EMAILS_SENT_TOTAL
            .with_label_values(&["test-provider", "delivered"])
            .get();

        record_email_sent("test-provider", "delivered");
        record_email_sent("test-provider", "delivered");
        record_email_sent("test-provider", "failed");

        assert_eq!(
            EMAILS_SENT_TOTAL
                .with_label_values(&["test-provider", "delivered"])
                .get(),
            before + 2
        );
    }
}

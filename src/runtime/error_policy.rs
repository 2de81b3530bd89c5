//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loops.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::ResourceKey;
use crate::observability::metrics;
use kube::Resource;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Key under which requeue backoff is tracked for a resource
pub fn backoff_key(kind: &str, key: &ResourceKey) -> String {
    format!("{kind}/{key}")
}

/// Handle reconciliation errors with per-resource Fibonacci backoff
pub fn handle_reconciliation_error<K>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    let key = ResourceKey::from_meta(obj.meta());

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = %kind,
        resource.namespace = %key.namespace,
        resource.name = %key.name,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {} {}: {:?}", kind, key, error);

    let (delay, error_count) = ctx.next_error_backoff(&backoff_key(&kind, &key));
    let next_attempt = chrono::TimeDelta::from_std(delay)
        .ok()
        .and_then(|d| chrono::Utc::now().checked_add_signed(d))
        .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());
    info!(
        "Retrying {} {} in {}s at {} (error count: {})",
        kind,
        key,
        delay.as_secs(),
        next_attempt,
        error_count
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}

/// Watch stream failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    ResourceVersionExpired,
    StorageReinitializing,
    NotFound,
    Other,
}

/// Classify a watch error from its debug rendering
///
/// Not-found is checked first: a plain-text 404 body surfaces as a decode error
/// that can also mention unrelated status codes.
pub fn classify_watch_error(error: &str) -> WatchErrorKind {
    let is_not_found =
        error.contains("ObjectNotFound") || error.contains("404") || error.contains("not found");
    if is_not_found {
        WatchErrorKind::NotFound
    } else if error.contains("401") || error.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if error.contains("410")
        || error.contains("too old resource version")
        || error.contains("Expired")
        || error.contains("Gone")
    {
        WatchErrorKind::ResourceVersionExpired
    } else if error.contains("429")
        || error.contains("storage is (re)initializing")
        || error.contains("TooManyRequests")
    {
        WatchErrorKind::StorageReinitializing
    } else {
        WatchErrorKind::Other
    }
}

/// Log and pace a watch stream error
///
/// Returns `true` if the event should be passed on, `false` to drop it.
pub async fn handle_watch_stream_error(
    kind: &str,
    error: &str,
    backoff_ms: &AtomicU64,
    max_backoff_ms: u64,
    watch_restart_delay: Duration,
) -> bool {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        resource.kind = kind,
        error = %error
    );
    let _error_guard = error_span.enter();

    match classify_watch_error(error) {
        WatchErrorKind::Unauthorized => {
            error!(
                "{} watch authentication failed (401 Unauthorized); check the operator's ServiceAccount and RBAC",
                kind
            );
            warn!(
                "Waiting {}s before retrying watch",
                watch_restart_delay.as_secs()
            );
            tokio::time::sleep(watch_restart_delay).await;
            false
        }
        WatchErrorKind::ResourceVersionExpired => {
            warn!(error_type = "410", "watch.error.resource_version_expired");
            false
        }
        WatchErrorKind::StorageReinitializing => {
            let current = backoff_ms.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms",
                current
            );
            tokio::time::sleep(Duration::from_millis(current)).await;
            backoff_ms.store(current.saturating_mul(2).min(max_backoff_ms), Ordering::Relaxed);
            false
        }
        WatchErrorKind::NotFound => {
            warn!(
                "{} not found (404); the resource may have been deleted or its CRD is not installed. Error: {}",
                kind, error
            );
            true
        }
        WatchErrorKind::Other => {
            error!("{} controller stream error: {}", kind, error);
            tokio::time::sleep(watch_restart_delay).await;
            false
        }
    }
}

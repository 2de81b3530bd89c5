//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::credential::{CredentialDecodeError, CredentialEncoding};
use crate::controller::secret::SecretError;
use crate::controller::store::{ResourceStore, StoreError};
use crate::provider::ProviderRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Failures that are not recorded in status and must be retried by the runtime
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to read {resource}: {source}")]
    Lookup {
        resource: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to resolve credential: {0}")]
    Secret(#[source] SecretError),
    #[error("secret {secret} holds a malformed apiToken: {source}")]
    CredentialDecode {
        secret: String,
        #[source]
        source: CredentialDecodeError,
    },
    #[error("failed to update status of {resource}: {source}")]
    StatusUpdate {
        resource: String,
        #[source]
        source: StoreError,
    },
}

/// Backoff state for a specific resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }
}

/// Shared context for both reconcilers
#[derive(Clone)]
pub struct Reconciler {
    pub store: Arc<dyn ResourceStore>,
    pub providers: ProviderRegistry,
    /// Applied to every `apiToken` read, whichever resource kind is reconciled
    pub credential_encoding: CredentialEncoding,
    // Keyed by "<kind>/<namespace>/<name>"; only the error policy writes here
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    pub error_backoff_min_secs: u64,
    pub error_backoff_max_secs: u64,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("providers", &self.providers.len())
            .field("credential_encoding", &self.credential_encoding)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        providers: ProviderRegistry,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            store,
            providers,
            credential_encoding: config.credential_encoding,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            error_backoff_min_secs: config.error_backoff_min_secs,
            error_backoff_max_secs: config.error_backoff_max_secs,
        }
    }

    /// Record a failure for `resource_key` and return (delay, consecutive error count)
    pub fn next_error_backoff(&self, resource_key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(resource_key.to_string()).or_insert_with(|| {
                    BackoffState::new(self.error_backoff_min_secs, self.error_backoff_max_secs)
                });
                state.increment_error();
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using minimum backoff", e);
                (Duration::from_secs(self.error_backoff_min_secs), 0)
            }
        }
    }

    /// Drop the failure history for `resource_key` after a successful reconcile
    pub fn reset_backoff(&self, resource_key: &str) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                states.remove(resource_key);
            }
            Err(e) => warn!("Failed to lock backoff_states: {}, backoff not reset", e),
        }
    }
}

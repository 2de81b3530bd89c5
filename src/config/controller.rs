//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::controller::backoff::RetryPolicy;
use crate::controller::credential::CredentialEncoding;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::warn;

/// Base URLs of the provider APIs
///
/// Only the scheme/host part is configurable; request paths are fixed by each provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub mailersend: String,
    pub mailgun: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        use crate::constants::{MAILERSEND_API_BASE_URL, MAILGUN_API_BASE_URL};
        Self {
            mailersend: MAILERSEND_API_BASE_URL.to_string(),
            mailgun: MAILGUN_API_BASE_URL.to_string(),
        }
    }
}

/// HTTP server settings for metrics and probes
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub metrics_port: u16,
    /// How long to wait for the server to bind before giving up
    pub startup_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        use crate::constants::{
            DEFAULT_METRICS_PORT, DEFAULT_SERVER_POLL_INTERVAL_MS,
            DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
        };
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", defaults.metrics_port),
            startup_timeout_secs: env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                defaults.startup_timeout_secs,
            ),
            poll_interval_ms: env_var_or_default(
                "SERVER_POLL_INTERVAL_MS",
                defaults.poll_interval_ms,
            ),
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Field manager recorded on status patches
    pub field_manager: String,
    /// How the `apiToken` secret field is encoded
    pub credential_encoding: CredentialEncoding,
    /// Timeout for a whole provider request (seconds)
    pub http_timeout_secs: u64,
    /// Timeout for establishing a provider connection (seconds)
    pub http_connect_timeout_secs: u64,
    /// Retries after a transport failure (0 disables retrying)
    pub http_max_retries: u32,
    pub http_retry_initial_ms: u64,
    pub http_retry_max_ms: u64,
    /// Requeue backoff bounds after a failed reconcile (seconds)
    pub error_backoff_min_secs: u64,
    pub error_backoff_max_secs: u64,
    /// How often a sender identity is re-verified (seconds)
    pub sender_config_reverify_secs: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    pub endpoints: ProviderEndpoints,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            watch_namespace: None,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            credential_encoding: CredentialEncoding::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            http_connect_timeout_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            http_max_retries: DEFAULT_HTTP_MAX_RETRIES,
            http_retry_initial_ms: DEFAULT_HTTP_RETRY_INITIAL_MS,
            http_retry_max_ms: DEFAULT_HTTP_RETRY_MAX_MS,
            error_backoff_min_secs: DEFAULT_ERROR_BACKOFF_MIN_SECS,
            error_backoff_max_secs: DEFAULT_ERROR_BACKOFF_MAX_SECS,
            sender_config_reverify_secs: DEFAULT_SENDER_CONFIG_REVERIFY_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            endpoints: ProviderEndpoints::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    /// Returns an error if `CREDENTIAL_ENCODING` names an unknown encoding
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let credential_encoding = match lookup("CREDENTIAL_ENCODING") {
            Some(value) => value
                .parse::<CredentialEncoding>()
                .context("Invalid CREDENTIAL_ENCODING")?,
            None => defaults.credential_encoding,
        };

        Ok(Self {
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty()),
            field_manager: lookup("FIELD_MANAGER").unwrap_or(defaults.field_manager),
            credential_encoding,
            http_timeout_secs: parse_or_default(
                &lookup,
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout_secs,
            ),
            http_connect_timeout_secs: parse_or_default(
                &lookup,
                "HTTP_CONNECT_TIMEOUT_SECS",
                defaults.http_connect_timeout_secs,
            ),
            http_max_retries: parse_or_default(
                &lookup,
                "HTTP_MAX_RETRIES",
                defaults.http_max_retries,
            ),
            http_retry_initial_ms: parse_or_default(
                &lookup,
                "HTTP_RETRY_INITIAL_MS",
                defaults.http_retry_initial_ms,
            ),
            http_retry_max_ms: parse_or_default(
                &lookup,
                "HTTP_RETRY_MAX_MS",
                defaults.http_retry_max_ms,
            ),
            error_backoff_min_secs: parse_or_default(
                &lookup,
                "ERROR_BACKOFF_MIN_SECS",
                defaults.error_backoff_min_secs,
            ),
            error_backoff_max_secs: parse_or_default(
                &lookup,
                "ERROR_BACKOFF_MAX_SECS",
                defaults.error_backoff_max_secs,
            ),
            sender_config_reverify_secs: parse_or_default(
                &lookup,
                "SENDER_CONFIG_REVERIFY_SECS",
                defaults.sender_config_reverify_secs,
            ),
            watch_restart_delay_secs: parse_or_default(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
            endpoints: ProviderEndpoints {
                mailersend: lookup("MAILERSEND_API_ENDPOINT")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.endpoints.mailersend),
                mailgun: lookup("MAILGUN_API_ENDPOINT")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.endpoints.mailgun),
            },
        })
    }

    /// Get provider request timeout duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Get provider connect timeout duration
    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http_connect_timeout_secs)
    }

    /// Retry policy for provider transport failures
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.http_max_retries,
            Duration::from_millis(self.http_retry_initial_ms),
            Duration::from_millis(self.http_retry_max_ms),
        )
    }

    /// Get sender config re-verification interval
    pub fn sender_config_reverify_interval(&self) -> Duration {
        Duration::from_secs(self.sender_config_reverify_secs)
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    parse_or_default(&|k: &str| std::env::var(k).ok(), key, default)
}

fn parse_or_default<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring malformed value for {}: {:?}", key, raw);
            default
        }),
        None => default,
    }
}

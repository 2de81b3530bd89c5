//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group shared by both custom resources
pub const API_GROUP: &str = "email.mailerlite.com";

/// Secret field holding the provider API token
pub const API_TOKEN_FIELD: &str = "apiToken";

/// Default field manager used for status patches
pub const DEFAULT_FIELD_MANAGER: &str = "mailerlite-operator";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default timeout for a whole outbound provider request
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default timeout for establishing a provider connection
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default number of retries after a transport failure
pub const DEFAULT_HTTP_MAX_RETRIES: u32 = 3;

/// Default delay before the first transport retry (milliseconds)
pub const DEFAULT_HTTP_RETRY_INITIAL_MS: u64 = 200;

/// Default cap on the delay between transport retries (milliseconds)
pub const DEFAULT_HTTP_RETRY_MAX_MS: u64 = 5_000;

/// Default minimum requeue delay after a failed reconcile (seconds)
pub const DEFAULT_ERROR_BACKOFF_MIN_SECS: u64 = 5;

/// Default maximum requeue delay after a failed reconcile (seconds)
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Default interval between credential re-verifications (seconds)
pub const DEFAULT_SENDER_CONFIG_REVERIFY_SECS: u64 = 300;

/// Default delay before restarting a watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Production MailerSend API base URL
pub const MAILERSEND_API_BASE_URL: &str = "https://api.mailersend.com";

/// Production Mailgun API base URL
pub const MAILGUN_API_BASE_URL: &str = "https://api.mailgun.net";

/// Sender domain fragment routed to MailerSend
pub const MAILERSEND_DOMAIN_MATCH: &str = "mlsender.net";

/// Sender domain fragment routed to Mailgun
pub const MAILGUN_DOMAIN_MATCH: &str = "mailgun.org";

/// Email status error when the referenced EmailSenderConfig does not exist
pub const MSG_SENDER_CONFIG_NOT_FOUND: &str = "EmailSenderConfig not found";

/// Status error when the credential Secret (or its `apiToken` field) is missing
pub const MSG_SECRET_NOT_FOUND: &str = "Secret not found";

/// EmailSenderConfig status error when the provider rejects the token
pub const MSG_AUTH_FAILED: &str = "Failed auth using apiToken";

/// EmailSenderConfig status error when the provider could not be reached
pub const MSG_PROVIDER_REQUEST_FAILED: &str = "Failed request provider api";

/// Initial backoff after the API server reports storage reinitialising (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_START_MS: u64 = 1_000;

/// Cap for the storage-reinitialising backoff (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_MAX_MS: u64 = 30_000;

//! # Controller
//!
//! Core controller modules for the MailerLite operator.
//!
//! - `backoff`: Fibonacci requeue backoff and transport retry policy
//! - `credential`: API token decoding and redaction
//! - `reconciler`: Email and EmailSenderConfig reconciliation
//! - `secret`: credential lookup from Secrets
//! - `server`: HTTP server for metrics and health checks
//! - `store`: resource reads and status writes

pub mod backoff;
pub mod credential;
pub mod reconciler;
pub mod secret;
pub mod server;
pub mod store;

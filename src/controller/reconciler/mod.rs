//! # Reconciler
//!
//! Reconciliation logic for the two custom resources.
//!
//! - `email`: sends an Email and records the delivery outcome
//! - `sender_config`: verifies an EmailSenderConfig's API token
//! - `status`: status persistence shared by both
//! - `types`: reconciler context and error type

pub mod email;
pub mod sender_config;
pub mod status;
pub mod types;

pub use email::reconcile_email;
pub use sender_config::reconcile_sender_config;
pub use types::{BackoffState, Reconciler, ReconcilerError};

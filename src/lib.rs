//! MailerLite Operator Library
//!
//! Reconciliation core for the `Email` and `EmailSenderConfig` custom resources:
//! credential lookup, provider selection, the MailerSend and Mailgun clients,
//! and the controller runtime that drives them.
//!
//! ## Quick Start
//!
//! ```rust
//! use mailerlite_operator::prelude::*;
//! ```

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;

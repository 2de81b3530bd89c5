//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use mailerlite_operator::prelude::*;
//! ```

pub use crate::crd::*;

pub use crate::provider::{
    DomainMatcher, EmailProvider, MailerSendProvider, MailgunProvider, OutboundEmail,
    ProviderError, ProviderRegistry, SentMessage,
};

pub use crate::controller::credential::{Credential, CredentialEncoding, RawCredential};
pub use crate::controller::reconciler::{
    reconcile_email, reconcile_sender_config, Reconciler, ReconcilerError,
};
pub use crate::controller::secret::{SecretError, SecretResolver};
pub use crate::controller::store::{KubeStore, ResourceStore, StoreError};

pub use crate::config::{ControllerConfig, ServerConfig};

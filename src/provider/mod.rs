//! # Provider Modules
//!
//! Mail provider integrations.
//!
//! Each provider implements [`EmailProvider`] and owns its wire format. The
//! [`ProviderRegistry`](registry::ProviderRegistry) picks one for a sender address,
//! so reconcilers never branch on provider names.

use crate::controller::credential::Credential;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

pub mod http;
pub mod mailersend;
pub mod mailgun;
pub mod registry;

pub use mailersend::MailerSendProvider;
pub use mailgun::MailgunProvider;
pub use registry::{DomainMatcher, ProviderRegistry};

/// A message ready to hand to a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundEmail<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

/// A message the provider accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unsupported email provider")]
    UnsupportedProvider { sender_email: String },
    #[error("invalid email format")]
    InvalidEmailFormat { email: String },
    #[error("request to {provider} failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to send email: {status}")]
    SendRejected {
        provider: &'static str,
        status: StatusCode,
    },
    #[error("{provider} rejected the API token: {status}")]
    CredentialRejected {
        provider: &'static str,
        status: StatusCode,
    },
    #[error("malformed response from {provider}: {source}")]
    MalformedResponse {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Provider trait for mail-sending APIs
#[async_trait]
pub trait EmailProvider: Send + Sync + std::fmt::Debug {
    /// Short provider name used in logs and metric labels
    fn name(&self) -> &'static str;

    /// Send one message
    ///
    /// Returns the provider's message identifier when the provider accepted the message.
    async fn send(
        &self,
        credential: &Credential,
        email: &OutboundEmail<'_>,
    ) -> Result<SentMessage, ProviderError>;

    /// Check that the credential is accepted by the provider
    ///
    /// Must only issue read-only requests so it can be repeated freely.
    async fn verify_credential(&self, credential: &Credential) -> Result<(), ProviderError>;
}

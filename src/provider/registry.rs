//! # Provider Registry
//!
//! Maps a sender address to the provider that should deliver for it.
//!
//! Matching is a case-insensitive substring test against the whole sender address,
//! evaluated in registration order; the first match wins.

use crate::config::ControllerConfig;
use crate::constants::{MAILERSEND_DOMAIN_MATCH, MAILGUN_DOMAIN_MATCH};
use crate::provider::http::build_client;
use crate::provider::{EmailProvider, MailerSendProvider, MailgunProvider, ProviderError};
use std::sync::Arc;
use tracing::debug;

/// Sender-address rule selecting a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainMatcher {
    fragment: String,
}

impl DomainMatcher {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into().to_lowercase(),
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn matches(&self, sender_email: &str) -> bool {
        sender_email.to_lowercase().contains(&self.fragment)
    }
}

/// Ordered set of (matcher, provider) entries
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: Vec<(DomainMatcher, Arc<dyn EmailProvider>)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider; earlier registrations take precedence
    pub fn register(&mut self, matcher: DomainMatcher, provider: Arc<dyn EmailProvider>) {
        debug!(
            fragment = matcher.fragment(),
            provider = provider.name(),
            "Registered email provider"
        );
        self.entries.push((matcher, provider));
    }

    #[must_use]
    pub fn with_provider(mut self, matcher: DomainMatcher, provider: Arc<dyn EmailProvider>) -> Self {
        self.register(matcher, provider);
        self
    }

    /// Registry with the built-in providers pointed at the configured endpoints
    ///
    /// Both providers share one HTTP client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn from_config(config: &ControllerConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(config.http_timeout(), config.http_connect_timeout())?;
        let retry = config.retry_policy();

        Ok(Self::new()
            .with_provider(
                DomainMatcher::new(MAILERSEND_DOMAIN_MATCH),
                Arc::new(MailerSendProvider::new(
                    client.clone(),
                    config.endpoints.mailersend.clone(),
                    retry,
                )),
            )
            .with_provider(
                DomainMatcher::new(MAILGUN_DOMAIN_MATCH),
                Arc::new(MailgunProvider::new(
                    client,
                    config.endpoints.mailgun.clone(),
                    retry,
                )),
            ))
    }

    /// Select the provider for `sender_email`
    ///
    /// # Errors
    /// Returns [`ProviderError::UnsupportedProvider`] when no matcher applies
    pub fn resolve(&self, sender_email: &str) -> Result<Arc<dyn EmailProvider>, ProviderError> {
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.matches(sender_email))
            .map(|(_, provider)| Arc::clone(provider))
            .ok_or_else(|| ProviderError::UnsupportedProvider {
                sender_email: sender_email.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

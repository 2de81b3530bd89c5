//! Mailgun Provider
//!
//! REST client for the Mailgun messages API.
//!
//! - Send: `POST {base}/v3/{domain}/messages`, HTTP Basic `api:<token>`,
//!   `multipart/form-data` with `from`, `to`, `subject`, `html`; success is `200 OK`
//! - Verify: `GET {base}/v4/domains`, same auth; success is `200 OK`
//!
//! The sending domain is the part of the sender address after its single `@`.

mod responses;

pub use responses::SendMessageResponse;

use crate::controller::backoff::RetryPolicy;
use crate::controller::credential::Credential;
use crate::observability::metrics;
use crate::provider::http::{execute_with_retry, read_body};
use crate::provider::{EmailProvider, OutboundEmail, ProviderError, SentMessage};
use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::{Client, StatusCode};
use tracing::{info, info_span, warn, Instrument};

const PROVIDER: &str = "mailgun";
const BASIC_AUTH_USER: &str = "api";

/// Extract the sending domain from a sender address
///
/// # Errors
/// Returns [`ProviderError::InvalidEmailFormat`] unless the address has exactly one `@`
/// followed by a non-empty domain
pub fn sender_domain(sender_email: &str) -> Result<&str, ProviderError> {
    let mut parts = sender_email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(domain), None) if !domain.is_empty() => Ok(domain),
        _ => Err(ProviderError::InvalidEmailFormat {
            email: sender_email.to_string(),
        }),
    }
}

/// Mailgun REST client
#[derive(Clone)]
pub struct MailgunProvider {
    http_client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for MailgunProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunProvider")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl MailgunProvider {
    pub fn new(http_client: Client, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    fn messages_url(&self, domain: &str) -> String {
        format!("{}/v3/{}/messages", self.base_url, domain)
    }

    fn domains_url(&self) -> String {
        format!("{}/v4/domains", self.base_url)
    }
}

#[async_trait]
impl EmailProvider for MailgunProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn send(
        &self,
        credential: &Credential,
        email: &OutboundEmail<'_>,
    ) -> Result<SentMessage, ProviderError> {
        let span = info_span!("provider.send", provider = PROVIDER);
        async move {
            // Checked before any network call
            let domain = sender_domain(email.from)?;
            let url = self.messages_url(domain);

            let response = execute_with_retry(PROVIDER, "send", self.retry, || {
                let form = Form::new()
                    .text("from", email.from.to_string())
                    .text("to", email.to.to_string())
                    .text("subject", email.subject.to_string())
                    .text("html", email.body.to_string());
                self.http_client
                    .post(&url)
                    .basic_auth(BASIC_AUTH_USER, Some(credential.expose()))
                    .multipart(form)
            })
            .await
            .inspect_err(|_| metrics::record_email_sent(PROVIDER, "transport_error"))?;

            let status = response.status();
            if status != StatusCode::OK {
                warn!(status = %status, domain, "Mailgun rejected the message");
                metrics::record_email_sent(PROVIDER, "rejected");
                return Err(ProviderError::SendRejected {
                    provider: PROVIDER,
                    status,
                });
            }

            let body = read_body(PROVIDER, response).await?;
            let sent = SendMessageResponse::decode(&body).map_err(|source| {
                metrics::record_email_sent(PROVIDER, "malformed_response");
                ProviderError::MalformedResponse {
                    provider: PROVIDER,
                    source,
                }
            })?;

            info!(
                message.id = %sent.id,
                domain,
                response = sent.message.as_deref().unwrap_or_default(),
                "Mailgun accepted the message"
            );
            metrics::record_email_sent(PROVIDER, "delivered");
            Ok(SentMessage {
                message_id: sent.id,
            })
        }
        .instrument(span)
        .await
    }

    async fn verify_credential(&self, credential: &Credential) -> Result<(), ProviderError> {
        let span = info_span!("provider.verify_credential", provider = PROVIDER);
        async move {
            let url = self.domains_url();
            let response = execute_with_retry(PROVIDER, "verify", self.retry, || {
                self.http_client
                    .get(&url)
                    .basic_auth(BASIC_AUTH_USER, Some(credential.expose()))
            })
            .await
            .inspect_err(|_| metrics::record_credential_verification(PROVIDER, "transport_error"))?;

            let status = response.status();
            if status == StatusCode::OK {
                metrics::record_credential_verification(PROVIDER, "valid");
                Ok(())
            } else {
                warn!(status = %status, "Mailgun rejected the API token");
                metrics::record_credential_verification(PROVIDER, "invalid");
                Err(ProviderError::CredentialRejected {
                    provider: PROVIDER,
                    status,
                })
            }
        }
        .instrument(span)
        .await
    }
}

//! MailerSend Provider
//!
//! REST client for the MailerSend email API.
//!
//! - Send: `POST {base}/v1/email`, bearer token, JSON body, success is `202 Accepted`
//! - Verify: `GET {base}/v1/domains`, bearer token, success is `200 OK`
//!
//! References:
//! - [MailerSend API](https://developers.mailersend.com/api/v1/email.html)

mod requests;
mod responses;

pub use requests::{Address, SendEmailRequest};
pub use responses::SendEmailAccepted;

use crate::controller::backoff::RetryPolicy;
use crate::controller::credential::Credential;
use crate::observability::metrics;
use crate::provider::http::{execute_with_retry, read_body};
use crate::provider::{EmailProvider, OutboundEmail, ProviderError, SentMessage};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{info, info_span, warn, Instrument};

const PROVIDER: &str = "mailersend";

/// MailerSend REST client
#[derive(Clone)]
pub struct MailerSendProvider {
    http_client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for MailerSendProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerSendProvider")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl MailerSendProvider {
    pub fn new(http_client: Client, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    fn email_url(&self) -> String {
        format!("{}/v1/email", self.base_url)
    }

    fn domains_url(&self) -> String {
        format!("{}/v1/domains", self.base_url)
    }
}

#[async_trait]
impl EmailProvider for MailerSendProvider {
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
            let request = SendEmailRequest::new(email.from, email.to, email.subject, email.body);
            let url = self.email_url();

            let response = execute_with_retry(PROVIDER, "send", self.retry, || {
                self.http_client
                    .post(&url)
                    .bearer_auth(credential.expose())
                    .json(&request)
            })
            .await
            .inspect_err(|_| metrics::record_email_sent(PROVIDER, "transport_error"))?;

            let status = response.status();
            if status != StatusCode::ACCEPTED {
                warn!(status = %status, "MailerSend rejected the message");
                metrics::record_email_sent(PROVIDER, "rejected");
                return Err(ProviderError::SendRejected {
                    provider: PROVIDER,
                    status,
                });
            }

            let body = read_body(PROVIDER, response).await?;
            let accepted = SendEmailAccepted::decode(&body).map_err(|source| {
                metrics::record_email_sent(PROVIDER, "malformed_response");
                ProviderError::MalformedResponse {
                    provider: PROVIDER,
                    source,
                }
            })?;

            info!(message.id = %accepted.message_id, "MailerSend accepted the message");
            metrics::record_email_sent(PROVIDER, "delivered");
            Ok(SentMessage {
                message_id: accepted.message_id,
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
                self.http_client.get(&url).bearer_auth(credential.expose())
            })
            .await
            .inspect_err(|_| metrics::record_credential_verification(PROVIDER, "transport_error"))?;

            let status = response.status();
            if status == StatusCode::OK {
                metrics::record_credential_verification(PROVIDER, "valid");
                Ok(())
            } else {
                warn!(status = %status, "MailerSend rejected the API token");
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

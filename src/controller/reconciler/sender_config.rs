//! # EmailSenderConfig Reconciliation
//!
//! Verifies that the sender's API token is accepted by its provider.
//! Verification only issues read-only requests, so it is safe to repeat on every
//! requeue.

use crate::constants::{MSG_AUTH_FAILED, MSG_PROVIDER_REQUEST_FAILED, MSG_SECRET_NOT_FOUND};
use crate::controller::reconciler::status::persist_sender_config_status;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::controller::secret::SecretResolver;
use crate::crd::{EmailSenderConfig, EmailSenderConfigStatus, ResourceKey};
use crate::observability::metrics;
use crate::provider::ProviderError;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

const KIND: &str = "EmailSenderConfig";

/// Reconcile one EmailSenderConfig
///
/// Returns `Ok(None)` when the resource no longer exists.
///
/// # Errors
/// Lookup failures other than not-found, malformed credentials, and status write
/// failures
pub async fn reconcile_sender_config(
    ctx: &Reconciler,
    key: &ResourceKey,
) -> Result<Option<EmailSenderConfigStatus>, ReconcilerError> {
    let span = info_span!(
        "reconcile",
        resource.kind = KIND,
        resource.namespace = %key.namespace,
        resource.name = %key.name
    );

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations(KIND);

        let result = run(ctx, key).await;

        metrics::observe_reconciliation_duration(KIND, start.elapsed());
        if let Err(e) = &result {
            warn!(error = %e, "EmailSenderConfig reconciliation failed");
            metrics::increment_reconciliation_errors(KIND);
        }
        result
    }
    .instrument(span)
    .await
}

async fn run(
    ctx: &Reconciler,
    key: &ResourceKey,
) -> Result<Option<EmailSenderConfigStatus>, ReconcilerError> {
    let config = ctx
        .store
        .get_sender_config(key)
        .await
        .map_err(|source| ReconcilerError::Lookup {
            resource: format!("EmailSenderConfig {key}"),
            source,
        })?;

    let Some(config) = config else {
        debug!("EmailSenderConfig no longer exists, nothing to do");
        return Ok(None);
    };

    let status = verify(ctx, key, &config).await?;
    persist_sender_config_status(ctx, key, config.status.as_ref(), &status).await?;
    Ok(Some(status))
}

async fn verify(
    ctx: &Reconciler,
    key: &ResourceKey,
    config: &EmailSenderConfig,
) -> Result<EmailSenderConfigStatus, ReconcilerError> {
    let generation = config.metadata.generation;

    let raw = match SecretResolver::resolve(
        ctx.store.as_ref(),
        &config.spec.api_token_secret_ref,
        &key.namespace,
    )
    .await
    {
        Ok(raw) => raw,
        Err(e) if e.is_status_visible() => {
            warn!(error = %e, "Credential secret unavailable");
            return Ok(EmailSenderConfigStatus::failed(MSG_SECRET_NOT_FOUND, generation));
        }
        Err(e) => return Err(ReconcilerError::Secret(e)),
    };

    let credential = ctx.credential_encoding.decode(&raw).map_err(|source| {
        ReconcilerError::CredentialDecode {
            secret: format!("{}/{}", key.namespace, config.spec.api_token_secret_ref),
            source,
        }
    })?;

    let provider = match ctx.providers.resolve(&config.spec.sender_email) {
        Ok(provider) => provider,
        Err(e) => {
            warn!(sender = %config.spec.sender_email, "No provider handles this sender");
            return Ok(EmailSenderConfigStatus::failed(e.to_string(), generation));
        }
    };

    match provider.verify_credential(&credential).await {
        Ok(()) => {
            info!(provider = provider.name(), "API token verified");
            Ok(EmailSenderConfigStatus::ready(generation))
        }
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "API token verification failed");
            Ok(EmailSenderConfigStatus::failed(
                verification_message(&e),
                generation,
            ))
        }
    }
}

/// Status text for a failed verification
fn verification_message(error: &ProviderError) -> String {
    match error {
        ProviderError::CredentialRejected { .. } => MSG_AUTH_FAILED.to_string(),
        ProviderError::Transport { .. } => MSG_PROVIDER_REQUEST_FAILED.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_verification_messages() {
        let rejected = ProviderError::CredentialRejected {
            provider: "mailgun",
            status: StatusCode::UNAUTHORIZED,
        };
        assert_eq!(verification_message(&rejected), "Failed auth using apiToken");

        let unsupported = ProviderError::UnsupportedProvider {
            sender_email: "x@gmail.com".into(),
        };
        assert_eq!(verification_message(&unsupported), "unsupported email provider");
    }
}

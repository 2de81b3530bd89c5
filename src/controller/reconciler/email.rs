//! # Email Reconciliation
//!
//! Delivers an Email through the provider behind its EmailSenderConfig and
//! records the outcome.
//!
//! Flow: load Email → load EmailSenderConfig → resolve secret → pick provider →
//! send → persist status. Missing dependencies and provider failures end up in
//! status; store failures and malformed credentials are returned for requeue.
//!
//! There is no de-duplication: if the status write after a successful send fails,
//! the next reconcile sends the message again.

use crate::constants::{MSG_SECRET_NOT_FOUND, MSG_SENDER_CONFIG_NOT_FOUND};
use crate::controller::reconciler::status::persist_email_status;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::controller::secret::SecretResolver;
use crate::crd::{Email, EmailStatus, ResourceKey};
use crate::observability::metrics;
use crate::provider::OutboundEmail;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

const KIND: &str = "Email";

/// Reconcile one Email
///
/// Returns `Ok(None)` when the Email no longer exists, otherwise the status that now
/// describes it.
///
/// # Errors
/// Lookup failures other than not-found, malformed credentials, and status write
/// failures
pub async fn reconcile_email(
    ctx: &Reconciler,
    key: &ResourceKey,
) -> Result<Option<EmailStatus>, ReconcilerError> {
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
            warn!(error = %e, "Email reconciliation failed");
            metrics::increment_reconciliation_errors(KIND);
        }
        result
    }
    .instrument(span)
    .await
}

async fn run(ctx: &Reconciler, key: &ResourceKey) -> Result<Option<EmailStatus>, ReconcilerError> {
    let email = ctx
        .store
        .get_email(key)
        .await
        .map_err(|source| ReconcilerError::Lookup {
            resource: format!("Email {key}"),
            source,
        })?;

    let Some(email) = email else {
        debug!("Email no longer exists, nothing to do");
        return Ok(None);
    };

    let status = deliver(ctx, key, &email).await?;
    persist_email_status(ctx, key, email.status.as_ref(), &status).await?;
    Ok(Some(status))
}

/// Compute the status for one delivery attempt
async fn deliver(
    ctx: &Reconciler,
    key: &ResourceKey,
    email: &Email,
) -> Result<EmailStatus, ReconcilerError> {
    let generation = email.metadata.generation;

    let config_key = ResourceKey::new(&key.namespace, &email.spec.sender_config_ref);
    let config = ctx
        .store
        .get_sender_config(&config_key)
        .await
        .map_err(|source| ReconcilerError::Lookup {
            resource: format!("EmailSenderConfig {config_key}"),
            source,
        })?;
    let Some(config) = config else {
        warn!(sender_config = %config_key, "Referenced EmailSenderConfig not found");
        return Ok(EmailStatus::failed(MSG_SENDER_CONFIG_NOT_FOUND, generation));
    };

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
            return Ok(EmailStatus::failed(MSG_SECRET_NOT_FOUND, generation));
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
            return Ok(EmailStatus::failed(e.to_string(), generation));
        }
    };

    let outbound = OutboundEmail {
        from: &config.spec.sender_email,
        to: &email.spec.recipient_email,
        subject: &email.spec.subject,
        body: &email.spec.body,
    };

    match provider.send(&credential, &outbound).await {
        Ok(sent) => {
            info!(
                provider = provider.name(),
                message.id = %sent.message_id,
                "Email delivered"
            );
            Ok(EmailStatus::delivered(sent.message_id, generation))
        }
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "Email delivery failed");
            Ok(EmailStatus::failed(e.to_string(), generation))
        }
    }
}

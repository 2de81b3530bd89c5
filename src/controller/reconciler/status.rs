//! # Status Persistence
//!
//! Writes computed statuses back to the store. A write is skipped when the
//! stored status already matches, so a reconcile that changes nothing does not
//! generate a watch event of its own.

use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::{EmailSenderConfigStatus, EmailStatus, ResourceKey};
use tracing::{debug, info};

/// Persist an Email status; returns whether a write happened
pub async fn persist_email_status(
    ctx: &Reconciler,
    key: &ResourceKey,
    current: Option<&EmailStatus>,
    desired: &EmailStatus,
) -> Result<bool, ReconcilerError> {
    if current == Some(desired) {
        debug!(resource = %key, "Email status unchanged, skipping update");
        return Ok(false);
    }

    ctx.store
        .patch_email_status(key, desired)
        .await
        .map_err(|source| ReconcilerError::StatusUpdate {
            resource: format!("Email {key}"),
            source,
        })?;

    info!(
        resource = %key,
        delivery_status = desired.delivery_status.as_str(),
        "Updated Email status"
    );
    Ok(true)
}

/// Persist an EmailSenderConfig status; returns whether a write happened
pub async fn persist_sender_config_status(
    ctx: &Reconciler,
    key: &ResourceKey,
    current: Option<&EmailSenderConfigStatus>,
    desired: &EmailSenderConfigStatus,
) -> Result<bool, ReconcilerError> {
    if current == Some(desired) {
        debug!(resource = %key, "EmailSenderConfig status unchanged, skipping update");
        return Ok(false);
    }

    ctx.store
        .patch_sender_config_status(key, desired)
        .await
        .map_err(|source| ReconcilerError::StatusUpdate {
            resource: format!("EmailSenderConfig {key}"),
            source,
        })?;

    info!(
        resource = %key,
        status = desired.status.as_str(),
        "Updated EmailSenderConfig status"
    );
    Ok(true)
}

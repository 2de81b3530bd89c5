//! # Resource Store
//!
//! Read/status-write access to the resources the reconcilers depend on.
//!
//! The reconcilers only ever talk to a [`ResourceStore`]; [`KubeStore`] backs it with
//! the Kubernetes API. Not-found is modelled as `Ok(None)`, never as an error, so
//! callers can tell an absent dependency from an unreachable API server.

use crate::crd::{Email, EmailSenderConfig, EmailSenderConfigStatus, EmailStatus, ResourceKey};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Kubernetes API request failed: {0}")]
    Kube(#[from] kube::Error),
    #[error("resource store unavailable: {0}")]
    Unavailable(String),
}

/// Storage operations used by the reconcilers
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_email(&self, key: &ResourceKey) -> Result<Option<Email>, StoreError>;

    async fn get_sender_config(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<EmailSenderConfig>, StoreError>;

    async fn get_secret(&self, key: &ResourceKey) -> Result<Option<Secret>, StoreError>;

    /// Replace the status of an Email
    async fn patch_email_status(
        &self,
        key: &ResourceKey,
        status: &EmailStatus,
    ) -> Result<(), StoreError>;

    /// Replace the status of an EmailSenderConfig
    async fn patch_sender_config_status(
        &self,
        key: &ResourceKey,
        status: &EmailSenderConfigStatus,
    ) -> Result<(), StoreError>;
}

/// [`ResourceStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn status_patch<S: serde::Serialize>(status: &S) -> Result<Patch<serde_json::Value>, StoreError> {
        let status = serde_json::to_value(status)
            .map_err(|e| StoreError::Unavailable(format!("failed to serialize status: {e}")))?;
        Ok(Patch::Merge(serde_json::json!({ "status": status })))
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_email(&self, key: &ResourceKey) -> Result<Option<Email>, StoreError> {
        let api: Api<Email> = Api::namespaced(self.client.clone(), &key.namespace);
        Ok(api.get_opt(&key.name).await?)
    }

    async fn get_sender_config(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<EmailSenderConfig>, StoreError> {
        let api: Api<EmailSenderConfig> = Api::namespaced(self.client.clone(), &key.namespace);
        Ok(api.get_opt(&key.name).await?)
    }

    async fn get_secret(&self, key: &ResourceKey) -> Result<Option<Secret>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &key.namespace);
        Ok(api.get_opt(&key.name).await?)
    }

    async fn patch_email_status(
        &self,
        key: &ResourceKey,
        status: &EmailStatus,
    ) -> Result<(), StoreError> {
        let api: Api<Email> = Api::namespaced(self.client.clone(), &key.namespace);
        api.patch_status(
            &key.name,
            &PatchParams::apply(&self.field_manager),
            &Self::status_patch(status)?,
        )
        .await?;
        debug!(resource = %key, "Patched Email status");
        Ok(())
    }

    async fn patch_sender_config_status(
        &self,
        key: &ResourceKey,
        status: &EmailSenderConfigStatus,
    ) -> Result<(), StoreError> {
        let api: Api<EmailSenderConfig> = Api::namespaced(self.client.clone(), &key.namespace);
        api.patch_status(
            &key.name,
            &PatchParams::apply(&self.field_manager),
            &Self::status_patch(status)?,
        )
        .await?;
        debug!(resource = %key, "Patched EmailSenderConfig status");
        Ok(())
    }
}

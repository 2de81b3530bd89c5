//! # Secret Resolver
//!
//! Looks up the Secret referenced by an EmailSenderConfig and extracts the raw
//! `apiToken` field. Decoding is left to [`CredentialEncoding`](super::credential::CredentialEncoding).

use crate::constants::API_TOKEN_FIELD;
use crate::controller::credential::RawCredential;
use crate::controller::store::{ResourceStore, StoreError};
use crate::crd::ResourceKey;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },
    #[error("{field} not found in secret {namespace}/{name}")]
    MissingCredentialField {
        namespace: String,
        name: String,
        field: &'static str,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SecretError {
    /// Whether the failure is a recordable outcome rather than a transient lookup error
    pub fn is_status_visible(&self) -> bool {
        !matches!(self, SecretError::Store(_))
    }
}

/// Resolves provider credentials from Secrets
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretResolver;

impl SecretResolver {
    /// Fetch `secret_name` in `namespace` and return its `apiToken` bytes
    ///
    /// # Errors
    /// - [`SecretError::NotFound`] if the Secret does not exist
    /// - [`SecretError::MissingCredentialField`] if it has no `apiToken` field
    /// - [`SecretError::Store`] if the lookup itself failed
    pub async fn resolve(
        store: &dyn ResourceStore,
        secret_name: &str,
        namespace: &str,
    ) -> Result<RawCredential, SecretError> {
        let key = ResourceKey::new(namespace, secret_name);

        let Some(secret) = store.get_secret(&key).await? else {
            warn!(secret = %key, "Secret not found");
            return Err(SecretError::NotFound {
                namespace: namespace.to_string(),
                name: secret_name.to_string(),
            });
        };

        let token = secret
            .data
            .as_ref()
            .and_then(|data| data.get(API_TOKEN_FIELD))
            .map(|value| value.0.clone())
            .or_else(|| {
                // stringData is write-only on a real API server but may be present on
                // objects that never went through one
                secret
                    .string_data
                    .as_ref()
                    .and_then(|data| data.get(API_TOKEN_FIELD))
                    .map(|value| value.clone().into_bytes())
            });

        match token {
            Some(bytes) => {
                debug!(secret = %key, "Resolved {} from secret", API_TOKEN_FIELD);
                Ok(RawCredential::new(bytes))
            }
            None => {
                warn!(secret = %key, "{} key missing in secret data", API_TOKEN_FIELD);
                Err(SecretError::MissingCredentialField {
                    namespace: namespace.to_string(),
                    name: secret_name.to_string(),
                    field: API_TOKEN_FIELD,
                })
            }
        }
    }
}

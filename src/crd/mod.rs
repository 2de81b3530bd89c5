//! # Custom Resource Definitions
//!
//! CRD types for the operator.
//!
//! ## Module Structure
//!
//! - `email.rs` - `Email` send requests and their delivery status
//! - `sender_config.rs` - `EmailSenderConfig` sending identities and their verification status

mod email;
mod sender_config;

pub use email::{DeliveryStatus, Email, EmailSpec, EmailStatus};
pub use sender_config::{
    EmailSenderConfig, EmailSenderConfigSpec, EmailSenderConfigStatus, SenderConfigState,
};

/// Namespace/name identity of a namespaced resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Build a key from object metadata, defaulting a missing namespace to `default`
    pub fn from_meta(meta: &kube::api::ObjectMeta) -> Self {
        Self::new(
            meta.namespace.as_deref().unwrap_or("default"),
            meta.name.as_deref().unwrap_or("unknown"),
        )
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

//! # EmailSenderConfig
//!
//! A sending identity bound to a provider credential stored in a Secret.

use serde::{Deserialize, Serialize};

/// EmailSenderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: email.mailerlite.com/v1
/// kind: EmailSenderConfig
/// metadata:
///   name: mailersend-sender
///   namespace: default
/// spec:
///   senderEmail: info@trial-xyz.mlsender.net
///   apiTokenSecretRef: mailersend-token
/// ```
#[derive(kube::CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "EmailSenderConfig",
    group = "email.mailerlite.com",
    version = "v1",
    namespaced,
    status = "EmailSenderConfigStatus",
    shortname = "esc",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EmailSenderConfigSpec {
    /// Address mail is sent from; its domain selects the provider
    pub sender_email: String,
    /// Name of the Secret (same namespace) holding the `apiToken` field
    pub api_token_secret_ref: String,
}

/// Verification state of an EmailSenderConfig
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum SenderConfigState {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl SenderConfigState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderConfigState::Pending => "Pending",
            SenderConfigState::Ready => "Ready",
            SenderConfigState::Failed => "Failed",
        }
    }
}

/// Status of the EmailSenderConfig resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailSenderConfigStatus {
    #[serde(default)]
    pub status: SenderConfigState,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl EmailSenderConfigStatus {
    pub fn ready(observed_generation: Option<i64>) -> Self {
        Self {
            status: SenderConfigState::Ready,
            error: String::new(),
            observed_generation,
        }
    }

    pub fn failed(error: impl Into<String>, observed_generation: Option<i64>) -> Self {
        Self {
            status: SenderConfigState::Failed,
            error: error.into(),
            observed_generation,
        }
    }
}

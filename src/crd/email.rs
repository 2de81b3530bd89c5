//! # Email
//!
//! A single send request and the delivery outcome recorded by the operator.

use serde::{Deserialize, Serialize};

/// Email Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: email.mailerlite.com/v1
/// kind: Email
/// metadata:
///   name: welcome
///   namespace: default
/// spec:
///   senderConfigRef: mailersend-sender
///   recipientEmail: someone@example.com
///   subject: Welcome
///   body: Thanks for signing up.
/// ```
#[derive(kube::CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Email",
    group = "email.mailerlite.com",
    version = "v1",
    namespaced,
    status = "EmailStatus",
    shortname = "em",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.deliveryStatus"}"#,
    printcolumn = r#"{"name":"MessageID", "type":"string", "jsonPath":".status.messageID"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EmailSpec {
    /// Name of the EmailSenderConfig (same namespace) to send through
    pub sender_config_ref: String,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
}

/// Delivery state of an Email
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum DeliveryStatus {
    /// Not reconciled yet
    #[default]
    Pending,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "Pending",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Failed => "Failed",
        }
    }
}

/// Status of the Email resource
///
/// Rewritten in full on every reconcile; no field survives from a previous outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailStatus {
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    /// Provider message identifier, set only when delivered
    #[serde(default, rename = "messageID")]
    pub message_id: String,
    /// Failure description, empty when delivered
    #[serde(default)]
    pub error: String,
    /// Generation of the spec this status was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl EmailStatus {
    pub fn delivered(message_id: impl Into<String>, observed_generation: Option<i64>) -> Self {
        Self {
            delivery_status: DeliveryStatus::Delivered,
            message_id: message_id.into(),
            error: String::new(),
            observed_generation,
        }
    }

    pub fn failed(error: impl Into<String>, observed_generation: Option<i64>) -> Self {
        Self {
            delivery_status: DeliveryStatus::Failed,
            message_id: String::new(),
            error: error.into(),
            observed_generation,
        }
    }
}

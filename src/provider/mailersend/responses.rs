//! # Response Types
//!
//! MailerSend API response bodies.

use serde::Deserialize;

/// Body returned with `202 Accepted` from `POST /v1/email`
///
/// Decoding fails if `x-message-id` is absent or not a string.
#[derive(Debug, Deserialize)]
pub struct SendEmailAccepted {
    #[serde(rename = "x-message-id")]
    pub message_id: String,
}

impl SendEmailAccepted {
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

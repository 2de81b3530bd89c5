//! # Response Types
//!
//! Mailgun API response bodies.

use serde::Deserialize;

/// Body returned with `200 OK` from `POST /v3/{domain}/messages`
#[derive(Debug, Deserialize)]
pub struct SendMessageResponse {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl SendMessageResponse {
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

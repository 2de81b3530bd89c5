//! # Credentials
//!
//! Provider API tokens as read from a Secret, and the decoding step that turns the
//! stored bytes into a usable token.
//!
//! Kubernetes already base64-decodes `Secret.data`, so by default the stored bytes
//! are the token itself (`raw`). Deployments that store the token base64-encoded a
//! second time select `base64`. Both reconcilers decode with the same encoding.

use base64::{engine::general_purpose, Engine as _};
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// Bytes of the `apiToken` field exactly as stored in the Secret
pub struct RawCredential(Zeroizing<Vec<u8>>);

impl RawCredential {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for RawCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawCredential").field(&"***").finish()
    }
}

/// Decoded provider API token
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// The token text, for placing into an auth header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&"***").finish()
    }
}

#[derive(Debug, Error)]
pub enum CredentialDecodeError {
    #[error("credential is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("credential is not valid UTF-8")]
    Utf8,
    #[error("credential is empty")]
    Empty,
}

/// Encoding of the `apiToken` secret field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialEncoding {
    /// Stored bytes are the token text
    #[default]
    Raw,
    /// Stored bytes are standard base64 of the token text
    Base64,
}

impl CredentialEncoding {
    /// Decode stored bytes into a token
    ///
    /// Surrounding whitespace is trimmed (tokens pasted with a trailing newline are common).
    ///
    /// # Errors
    /// Returns an error if the bytes are not valid for this encoding or decode to an empty token
    pub fn decode(self, raw: &RawCredential) -> Result<Credential, CredentialDecodeError> {
        let mut bytes = match self {
            CredentialEncoding::Raw => raw.as_bytes().to_vec(),
            CredentialEncoding::Base64 => {
                let trimmed = raw.as_bytes().trim_ascii();
                general_purpose::STANDARD.decode(trimmed)?
            }
        };

        let token = match std::str::from_utf8(&bytes) {
            Ok(text) => text.trim().to_string(),
            Err(_) => {
                bytes.zeroize();
                return Err(CredentialDecodeError::Utf8);
            }
        };
        bytes.zeroize();

        if token.is_empty() {
            return Err(CredentialDecodeError::Empty);
        }
        Ok(Credential::new(token))
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialEncoding::Raw => "raw",
            CredentialEncoding::Base64 => "base64",
        }
    }
}

impl FromStr for CredentialEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "plain" => Ok(CredentialEncoding::Raw),
            "base64" => Ok(CredentialEncoding::Base64),
            other => Err(anyhow::anyhow!(
                "unknown credential encoding '{other}' (expected 'raw' or 'base64')"
            )),
        }
    }
}

//! Common test utilities
//!
//! Provides rustls initialisation for Pact tests, an in-memory resource store,
//! resource fixtures and a scripted provider for reconciler tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use mailerlite_operator::config::ControllerConfig;
use mailerlite_operator::controller::credential::Credential;
use mailerlite_operator::controller::reconciler::Reconciler;
use mailerlite_operator::controller::store::{ResourceStore, StoreError};
use mailerlite_operator::crd::{
    Email, EmailSenderConfig, EmailSenderConfigSpec, EmailSenderConfigStatus, EmailSpec,
    EmailStatus, ResourceKey,
};
use mailerlite_operator::provider::{
    DomainMatcher, EmailProvider, OutboundEmail, ProviderError, ProviderRegistry, SentMessage,
};
use reqwest::StatusCode;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

pub const NAMESPACE: &str = "default";

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once per test binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Base URL of a Pact mock server without the trailing slash
pub fn mock_base_url(url: impl std::fmt::Display) -> String {
    url.to_string().trim_end_matches('/').to_string()
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// [`ResourceStore`] over hash maps, with failure injection
#[derive(Debug, Default)]
pub struct InMemoryStore {
    emails: Mutex<HashMap<ResourceKey, Email>>,
    sender_configs: Mutex<HashMap<ResourceKey, EmailSenderConfig>>,
    secrets: Mutex<HashMap<ResourceKey, Secret>>,
    pub email_status_writes: AtomicUsize,
    pub sender_config_status_writes: AtomicUsize,
    pub fail_status_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_email(&self, email: Email) {
        let key = ResourceKey::from_meta(&email.metadata);
        self.emails.lock().unwrap().insert(key, email);
    }

    pub fn insert_sender_config(&self, config: EmailSenderConfig) {
        let key = ResourceKey::from_meta(&config.metadata);
        self.sender_configs.lock().unwrap().insert(key, config);
    }

    pub fn insert_secret(&self, secret: Secret) {
        let key = ResourceKey::from_meta(&secret.metadata);
        self.secrets.lock().unwrap().insert(key, secret);
    }

    pub fn email_status(&self, key: &ResourceKey) -> Option<EmailStatus> {
        self.emails
            .lock()
            .unwrap()
            .get(key)
            .and_then(|email| email.status.clone())
    }

    pub fn sender_config_status(&self, key: &ResourceKey) -> Option<EmailSenderConfigStatus> {
        self.sender_configs
            .lock()
            .unwrap()
            .get(key)
            .and_then(|config| config.status.clone())
    }

    pub fn email_writes(&self) -> usize {
        self.email_status_writes.load(Ordering::SeqCst)
    }

    pub fn sender_config_writes(&self) -> usize {
        self.sender_config_status_writes.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_email(&self, key: &ResourceKey) -> Result<Option<Email>, StoreError> {
        self.check_reads()?;
        Ok(self.emails.lock().unwrap().get(key).cloned())
    }

    async fn get_sender_config(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<EmailSenderConfig>, StoreError> {
        self.check_reads()?;
        Ok(self.sender_configs.lock().unwrap().get(key).cloned())
    }

    async fn get_secret(&self, key: &ResourceKey) -> Result<Option<Secret>, StoreError> {
        self.check_reads()?;
        Ok(self.secrets.lock().unwrap().get(key).cloned())
    }

    async fn patch_email_status(
        &self,
        key: &ResourceKey,
        status: &EmailStatus,
    ) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut emails = self.emails.lock().unwrap();
        let email = emails
            .get_mut(key)
            .ok_or_else(|| StoreError::Unavailable(format!("{key} vanished")))?;
        email.status = Some(status.clone());
        self.email_status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn patch_sender_config_status(
        &self,
        key: &ResourceKey,
        status: &EmailSenderConfigStatus,
    ) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut configs = self.sender_configs.lock().unwrap();
        let config = configs
            .get_mut(key)
            .ok_or_else(|| StoreError::Unavailable(format!("{key} vanished")))?;
        config.status = Some(status.clone());
        self.sender_config_status_writes
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn meta(name: &str, generation: Option<i64>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        generation,
        ..ObjectMeta::default()
    }
}

pub fn key(name: &str) -> ResourceKey {
    ResourceKey::new(NAMESPACE, name)
}

pub fn email(name: &str, sender_config_ref: &str) -> Email {
    let mut email = Email::new(
        name,
        EmailSpec {
            sender_config_ref: sender_config_ref.to_string(),
            recipient_email: "a@b.com".to_string(),
            subject: "Hi".to_string(),
            body: "Hello there".to_string(),
        },
    );
    email.metadata = meta(name, Some(1));
    email
}

pub fn sender_config(name: &str, sender_email: &str, secret_ref: &str) -> EmailSenderConfig {
    let mut config = EmailSenderConfig::new(
        name,
        EmailSenderConfigSpec {
            sender_email: sender_email.to_string(),
            api_token_secret_ref: secret_ref.to_string(),
        },
    );
    config.metadata = meta(name, Some(1));
    config
}

pub fn secret_with_fields(name: &str, fields: &[(&str, &[u8])]) -> Secret {
    let data: BTreeMap<String, ByteString> = fields
        .iter()
        .map(|(field, value)| ((*field).to_string(), ByteString(value.to_vec())))
        .collect();
    Secret {
        metadata: meta(name, None),
        data: Some(data),
        ..Secret::default()
    }
}

pub fn token_secret(name: &str, token: &str) -> Secret {
    secret_with_fields(name, &[("apiToken", token.as_bytes())])
}

pub fn reconciler(store: Arc<InMemoryStore>, providers: ProviderRegistry) -> Reconciler {
    reconciler_with_config(store, providers, &ControllerConfig::default())
}

pub fn reconciler_with_config(
    store: Arc<InMemoryStore>,
    providers: ProviderRegistry,
    config: &ControllerConfig,
) -> Reconciler {
    let store: Arc<dyn ResourceStore> = store;
    Reconciler::new(store, providers, config)
}

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

/// Canned outcome for [`ScriptedProvider`]
#[derive(Debug, Clone)]
pub enum Script {
    Accept(String),
    Reject(StatusCode),
    Malformed,
    InvalidSender,
}

impl Script {
    fn send_result(&self, from: &str) -> Result<SentMessage, ProviderError> {
        match self {
            Script::Accept(id) => Ok(SentMessage {
                message_id: id.clone(),
            }),
            Script::Reject(status) => Err(ProviderError::SendRejected {
                provider: "scripted",
                status: *status,
            }),
            Script::Malformed => Err(ProviderError::MalformedResponse {
                provider: "scripted",
                source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
            }),
            Script::InvalidSender => Err(ProviderError::InvalidEmailFormat {
                email: from.to_string(),
            }),
        }
    }

    fn verify_result(&self) -> Result<(), ProviderError> {
        match self {
            Script::Accept(_) => Ok(()),
            Script::Reject(status) => Err(ProviderError::CredentialRejected {
                provider: "scripted",
                status: *status,
            }),
            other => other.send_result("x").map(|_| ()),
        }
    }
}

/// Provider returning a fixed outcome and recording what it was asked
#[derive(Debug)]
pub struct ScriptedProvider {
    script: Script,
    pub sends: AtomicUsize,
    pub verifications: AtomicUsize,
    pub last_token: Mutex<Option<String>>,
    pub last_email: Mutex<Option<(String, String, String, String)>>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            sends: AtomicUsize::new(0),
            verifications: AtomicUsize::new(0),
            last_token: Mutex::new(None),
            last_email: Mutex::new(None),
        })
    }

    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send(
        &self,
        credential: &Credential,
        email: &OutboundEmail<'_>,
    ) -> Result<SentMessage, ProviderError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(credential.expose().to_string());
        *self.last_email.lock().unwrap() = Some((
            email.from.to_string(),
            email.to.to_string(),
            email.subject.to_string(),
            email.body.to_string(),
        ));
        self.script.send_result(email.from)
    }

    async fn verify_credential(&self, credential: &Credential) -> Result<(), ProviderError> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(credential.expose().to_string());
        self.script.verify_result()
    }
}

/// Registry routing `fragment` to `provider`
pub fn registry_with(fragment: &str, provider: Arc<ScriptedProvider>) -> ProviderRegistry {
    let provider: Arc<dyn EmailProvider> = provider;
    ProviderRegistry::new().with_provider(DomainMatcher::new(fragment), provider)
}

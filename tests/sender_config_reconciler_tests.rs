//! EmailSenderConfig reconciliation tests

mod common;

use common::*;
use mailerlite_operator::config::ControllerConfig;
use mailerlite_operator::controller::backoff::RetryPolicy;
use mailerlite_operator::controller::credential::CredentialEncoding;
use mailerlite_operator::controller::reconciler::{reconcile_sender_config, ReconcilerError};
use mailerlite_operator::crd::{EmailSenderConfigStatus, SenderConfigState};
use mailerlite_operator::provider::{DomainMatcher, EmailProvider, MailgunProvider, ProviderRegistry};
use pact_consumer::prelude::*;
use reqwest::StatusCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn seeded_store(sender_email: &str) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    store.insert_sender_config(sender_config("sender", sender_email, "token"));
    store.insert_secret(token_secret("token", "tok"));
    store
}

#[tokio::test]
async fn test_rejected_token_marks_failed() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("MailerLite-Operator", "Mailgun");
    pact_builder.interaction("verify a revoked key", "", |mut i| {
        i.request
            .method("GET")
            .path("/v4/domains".to_string())
            .header("authorization", "Basic YXBpOnRvaw==");
        i.response.status(401);
        i
    });
    let mock_server = pact_builder.start_mock_server(None, None);

    let provider: Arc<dyn EmailProvider> = Arc::new(MailgunProvider::new(
        reqwest::Client::new(),
        mock_base_url(mock_server.url()),
        RetryPolicy::no_retry(),
    ));
    let registry =
        ProviderRegistry::new().with_provider(DomainMatcher::new("mailgun.org"), provider);
    let store = seeded_store("x@sandbox.mailgun.org");
    let ctx = reconciler(store.clone(), registry);

    let status = reconcile_sender_config(&ctx, &key("sender"))
        .await
        .expect("rejection is recorded, not raised")
        .expect("config exists");

    assert_eq!(status.status, SenderConfigState::Failed);
    assert!(!status.error.is_empty());
    assert_eq!(status.error, "Failed auth using apiToken");
    assert_eq!(store.sender_config_status(&key("sender")), Some(status));
}

#[tokio::test]
async fn test_accepted_token_marks_ready() {
    let store = seeded_store("x@mlsender.net");
    let provider = ScriptedProvider::new(Script::Accept(String::new()));
    let ctx = reconciler(store.clone(), registry_with("mlsender.net", provider.clone()));

    let status = reconcile_sender_config(&ctx, &key("sender"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(status, EmailSenderConfigStatus::ready(Some(1)));
    assert!(status.error.is_empty());
    assert_eq!(provider.verify_count(), 1);
    assert_eq!(provider.send_count(), 0);
    assert_eq!(provider.token().as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_reverification_does_not_rewrite_unchanged_status() {
    let store = seeded_store("x@mlsender.net");
    let provider = ScriptedProvider::new(Script::Accept(String::new()));
    let ctx = reconciler(store.clone(), registry_with("mlsender.net", provider.clone()));

    for _ in 0..3 {
        reconcile_sender_config(&ctx, &key("sender")).await.unwrap();
    }

    assert_eq!(provider.verify_count(), 3);
    assert_eq!(store.sender_config_writes(), 1);
}

#[tokio::test]
async fn test_missing_secret() {
    let store = InMemoryStore::new();
    store.insert_sender_config(sender_config("sender", "x@mlsender.net", "absent"));
    let provider = ScriptedProvider::new(Script::Accept(String::new()));
    let ctx = reconciler(store.clone(), registry_with("mlsender.net", provider.clone()));

    let status = reconcile_sender_config(&ctx, &key("sender"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(status, EmailSenderConfigStatus::failed("Secret not found", Some(1)));
    assert_eq!(provider.verify_count(), 0);
}

#[tokio::test]
async fn test_unsupported_provider() {
    let store = seeded_store("x@example.com");
    let provider = ScriptedProvider::new(Script::Accept(String::new()));
    let ctx = reconciler(store, registry_with("mlsender.net", provider.clone()));

    let status = reconcile_sender_config(&ctx, &key("sender"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(status.status, SenderConfigState::Failed);
    assert_eq!(status.error, "unsupported email provider");
    assert_eq!(provider.verify_count(), 0);
}

#[tokio::test]
async fn test_unreachable_provider() {
    init_rustls();
    let config = ControllerConfig {
        endpoints: mailerlite_operator::config::ProviderEndpoints {
            mailersend: "http://127.0.0.1:1".to_string(),
            mailgun: "http://127.0.0.1:1".to_string(),
        },
        http_max_retries: 0,
        ..ControllerConfig::default()
    };
    let store = seeded_store("x@mlsender.net");
    let ctx = reconciler_with_config(
        store,
        ProviderRegistry::from_config(&config).expect("client builds"),
        &config,
    );

    let status = reconcile_sender_config(&ctx, &key("sender"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(status.error, "Failed request provider api");
}

#[tokio::test]
async fn test_ready_config_fails_after_token_revoked() {
    let store = seeded_store("x@mlsender.net");
    let accepted = ScriptedProvider::new(Script::Accept(String::new()));
    let ctx = reconciler(store.clone(), registry_with("mlsender.net", accepted));
    reconcile_sender_config(&ctx, &key("sender")).await.unwrap();

    let rejected = ScriptedProvider::new(Script::Reject(StatusCode::UNAUTHORIZED));
    let ctx = reconciler(store.clone(), registry_with("mlsender.net", rejected));
    let status = reconcile_sender_config(&ctx, &key("sender"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(status.status, SenderConfigState::Failed);
    assert_eq!(store.sender_config_writes(), 2);
}

#[tokio::test]
async fn test_deleted_config_is_a_no_op() {
    let store = InMemoryStore::new();
    let provider = ScriptedProvider::new(Script::Accept(String::new()));
    let ctx = reconciler(store.clone(), registry_with("mlsender.net", provider));

    assert!(reconcile_sender_config(&ctx, &key("gone"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_status_write_failure_is_raised() {
    let store = seeded_store("x@mlsender.net");
    store.fail_status_writes.store(true, Ordering::SeqCst);
    let provider = ScriptedProvider::new(Script::Accept(String::new()));
    let ctx = reconciler(store, registry_with("mlsender.net", provider));

    let err = reconcile_sender_config(&ctx, &key("sender"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcilerError::StatusUpdate { .. }));
}

#[tokio::test]
async fn test_same_encoding_as_email_reconciler() {
    let store = InMemoryStore::new();
    store.insert_sender_config(sender_config("sender", "x@mlsender.net", "token"));
    store.insert_secret(token_secret("token", "dG9r\n"));
    let provider = ScriptedProvider::new(Script::Accept(String::new()));
    let config = ControllerConfig {
        credential_encoding: CredentialEncoding::Base64,
        ..ControllerConfig::default()
    };
    let ctx = reconciler_with_config(store, registry_with("mlsender.net", provider.clone()), &config);

    reconcile_sender_config(&ctx, &key("sender")).await.unwrap();

    assert_eq!(provider.token().as_deref(), Some("tok"));
}

//! Pact contract tests for the Mailgun API
//!
//! The multipart body carries a random boundary, so interactions pin method, path
//! and authentication; the form fields are covered by the provider's own tests.

mod common;

use common::{init_rustls, mock_base_url};
use mailerlite_operator::controller::backoff::RetryPolicy;
use mailerlite_operator::controller::credential::Credential;
use mailerlite_operator::provider::{EmailProvider, MailgunProvider, OutboundEmail, ProviderError};
use pact_consumer::prelude::*;
use serde_json::json;

const CONSUMER: &str = "MailerLite-Operator";
const PROVIDER: &str = "Mailgun";

// base64("api:tok")
const BASIC_AUTH: &str = "Basic YXBpOnRvaw==";

fn outbound() -> OutboundEmail<'static> {
    OutboundEmail {
        from: "x@sandbox.mailgun.org",
        to: "a@b.com",
        subject: "Hi",
        body: "<p>Hello there</p>",
    }
}

fn provider_for(base_url: &str) -> MailgunProvider {
    MailgunProvider::new(reqwest::Client::new(), base_url, RetryPolicy::no_retry())
}

#[tokio::test]
async fn test_mailgun_send_accepted_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("send a message from the sender's domain", "", |mut i| {
        i.given("the sandbox.mailgun.org domain exists");
        i.request
            .method("POST")
            .path("/v3/sandbox.mailgun.org/messages".to_string())
            .header("authorization", BASIC_AUTH);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "id": "<20240101000000.1@sandbox.mailgun.org>",
                "message": "Queued. Thank you."
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let provider = provider_for(&mock_base_url(mock_server.url()));

    let sent = provider
        .send(&Credential::new("tok"), &outbound())
        .await
        .expect("send should succeed");
    assert_eq!(sent.message_id, "<20240101000000.1@sandbox.mailgun.org>");
}

#[tokio::test]
async fn test_mailgun_send_unauthorized_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("send a message with a bad key", "", |mut i| {
        i.request
            .method("POST")
            .path("/v3/sandbox.mailgun.org/messages".to_string())
            .header("authorization", BASIC_AUTH);
        i.response.status(401);
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let provider = provider_for(&mock_base_url(mock_server.url()));

    let err = provider
        .send(&Credential::new("tok"), &outbound())
        .await
        .expect_err("401 must not count as delivered");
    assert_eq!(err.to_string(), "failed to send email: 401 Unauthorized");
}

#[tokio::test]
async fn test_mailgun_send_without_id_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("send a message and get no id back", "", |mut i| {
        i.request
            .method("POST")
            .path("/v3/sandbox.mailgun.org/messages".to_string())
            .header("authorization", BASIC_AUTH);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "message": "Queued. Thank you." }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let provider = provider_for(&mock_base_url(mock_server.url()));

    let err = provider
        .send(&Credential::new("tok"), &outbound())
        .await
        .expect_err("missing id must be rejected");
    assert!(matches!(err, ProviderError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_mailgun_verify_valid_key_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("list domains with a valid key", "", |mut i| {
        i.given("the API key is valid");
        i.request
            .method("GET")
            .path("/v4/domains".to_string())
            .header("authorization", BASIC_AUTH);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "items": [], "total_count": 0 }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let provider = provider_for(&mock_base_url(mock_server.url()));

    provider
        .verify_credential(&Credential::new("tok"))
        .await
        .expect("key should verify");
}

#[tokio::test]
async fn test_mailgun_verify_rejected_key_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("list domains with a bad key", "", |mut i| {
        i.request
            .method("GET")
            .path("/v4/domains".to_string())
            .header("authorization", BASIC_AUTH);
        i.response.status(401);
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let provider = provider_for(&mock_base_url(mock_server.url()));

    let err = provider
        .verify_credential(&Credential::new("tok"))
        .await
        .expect_err("401 must reject the key");
    assert!(matches!(err, ProviderError::CredentialRejected { .. }));
}

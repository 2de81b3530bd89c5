//! # MailerLite Operator
//!
//! Kubernetes operator that delivers `Email` resources through the provider
//! configured by their `EmailSenderConfig`, and keeps each sender's API token
//! verified.

use anyhow::Result;
use mailerlite_operator::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.client,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await
}

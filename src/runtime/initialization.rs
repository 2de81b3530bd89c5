//! # Initialization
//!
//! Operator startup: rustls setup, tracing, metrics, server startup,
//! Kubernetes client and reconciler construction.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::controller::store::KubeStore;
use crate::crd::{Email, EmailSenderConfig};
use crate::observability;
use crate::provider::ProviderRegistry;
use crate::runtime::watch_loop::scoped_api;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub controller_config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Provider registry and reconciler setup
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any TLS client is built
    let rustls_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailerlite_operator=info".into()),
        )
        .init();

    if !rustls_installed {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting MailerLite operator v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let controller_config =
        ControllerConfig::from_env().context("Failed to load controller configuration")?;
    let server_config = ServerConfig::from_env();
    info!(
        watch_namespace = controller_config.watch_namespace.as_deref().unwrap_or("*"),
        credential_encoding = controller_config.credential_encoding.as_str(),
        mailersend_endpoint = %controller_config.endpoints.mailersend,
        mailgun_endpoint = %controller_config.endpoints.mailgun,
        "Loaded configuration"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());

    let server_state_clone = server_state.clone();
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    check_crd_queryable::<Email>(&client, &controller_config).await?;
    check_crd_queryable::<EmailSenderConfig>(&client, &controller_config).await?;

    let providers = ProviderRegistry::from_config(&controller_config)
        .context("Failed to build provider HTTP client")?;
    let store = Arc::new(KubeStore::new(
        client.clone(),
        controller_config.field_manager.clone(),
    ));
    let reconciler = Arc::new(Reconciler::new(store, providers, &controller_config));

    info!("Operator initialized, starting watch loops...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        controller_config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = std::time::Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = std::time::Duration::from_millis(server_config.poll_interval_ms);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Fail fast when a CRD is not installed
async fn check_crd_queryable<K>(client: &Client, config: &ControllerConfig) -> Result<()>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    let api: Api<K> = scoped_api(client, config.watch_namespace.as_deref());
    let kind = K::kind(&());

    let list = api
        .list(&ListParams::default().limit(1))
        .await
        .with_context(|| format!("{kind} CRD is not queryable; is it installed?"))?;
    info!(
        "{} CRD is queryable ({} resource(s) on first page)",
        kind,
        list.items.len()
    );
    Ok(())
}

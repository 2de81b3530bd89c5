//! # Watch Loop
//!
//! Runs one `kube_runtime::Controller` per resource kind and restarts a watch
//! stream whenever it ends, until shutdown is requested.

use crate::config::ControllerConfig;
use crate::constants::{DEFAULT_WATCH_BACKOFF_MAX_MS, DEFAULT_WATCH_BACKOFF_START_MS};
use crate::controller::reconciler::{
    reconcile_email, reconcile_sender_config, Reconciler, ReconcilerError,
};
use crate::controller::server::ServerState;
use crate::crd::{Email, EmailSenderConfig, ResourceKey};
use crate::runtime::error_policy::{
    backoff_key, handle_reconciliation_error, handle_watch_stream_error,
};
use futures::StreamExt;
use kube::api::Api;
use kube::{Client, Resource};
use kube_runtime::controller::{self, Action};
use kube_runtime::{watcher, Controller};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Run both controllers until shutdown
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: ControllerConfig,
) -> Result<(), anyhow::Error> {
    spawn_shutdown_listener(server_state.clone());

    let emails: Api<Email> = scoped_api(&client, config.watch_namespace.as_deref());
    let sender_configs: Api<EmailSenderConfig> =
        scoped_api(&client, config.watch_namespace.as_deref());
    let reverify_interval = config.sender_config_reverify_interval();

    tokio::join!(
        run_controller(
            emails,
            reconciler.clone(),
            server_state.clone(),
            &config,
            reconcile_email_object,
        ),
        run_controller(
            sender_configs,
            reconciler,
            server_state,
            &config,
            move |obj, ctx| reconcile_sender_config_object(obj, ctx, reverify_interval),
        ),
    );

    info!("Controllers stopped gracefully");
    Ok(())
}

/// Api over `namespace`, or over all namespaces when unset
pub fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Mark the server not ready on SIGINT/SIGTERM so the watch loops stop restarting
fn spawn_shutdown_listener(server_state: Arc<ServerState>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        info!("Received shutdown signal, initiating graceful shutdown...");
        server_state.set_ready(false);
    });
}

async fn run_controller<K, F, Fut>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: &ControllerConfig,
    reconcile: F,
) where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    F: FnMut(Arc<K>, Arc<Reconciler>) -> Fut + Clone,
    Fut: Future<Output = Result<Action, ReconcilerError>> + Send + 'static,
{
    let kind = K::kind(&()).to_string();
    let backoff_ms = Arc::new(AtomicU64::new(DEFAULT_WATCH_BACKOFF_START_MS));
    let restart_delay = config.watch_restart_delay_duration();

    loop {
        if !server_state.ready() {
            break;
        }

        info!("Starting {} controller watch...", kind);
        let backoff = backoff_ms.clone();
        let stream_kind = kind.clone();

        Controller::new(api.clone(), watcher::Config::default().any_semantic())
            .shutdown_on_signal()
            .run(
                reconcile.clone(),
                |obj, error, ctx| handle_reconciliation_error(obj, error, ctx),
                reconciler.clone(),
            )
            .filter_map(move |event| {
                let backoff = backoff.clone();
                let kind = stream_kind.clone();
                async move {
                    match &event {
                        Ok((obj, _)) => {
                            backoff.store(DEFAULT_WATCH_BACKOFF_START_MS, Ordering::Relaxed);
                            debug!(resource = %obj, "watch.event.success");
                            Some(event)
                        }
                        // Already logged and requeued by the error policy
                        Err(controller::Error::ReconcilerFailed(_, _)) => None,
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            handle_watch_stream_error(
                                &kind,
                                &error_string,
                                &backoff,
                                DEFAULT_WATCH_BACKOFF_MAX_MS,
                                restart_delay,
                            )
                            .await
                            .then_some(event)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .await;

        if !server_state.ready() {
            break;
        }

        warn!(
            "{} watch stream ended, restarting in {} seconds...",
            kind,
            restart_delay.as_secs()
        );
        tokio::time::sleep(restart_delay).await;
    }

    info!("{} controller stopped", kind);
}

/// Send an Email once per spec generation
///
/// Status writes leave `metadata.generation` untouched, so they never cause a
/// second send.
async fn reconcile_email_object(
    obj: Arc<Email>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let key = ResourceKey::from_meta(&obj.metadata);

    if already_processed(&obj) {
        debug!(
            resource = %key,
            generation = obj.metadata.generation,
            "Skipping Email - already processed for this generation"
        );
        return Ok(Action::await_change());
    }

    reconcile_email(&ctx, &key).await?;
    ctx.reset_backoff(&backoff_key("Email", &key));
    Ok(Action::await_change())
}

/// Whether the stored status was computed for the current spec generation
pub fn already_processed(email: &Email) -> bool {
    let generation = email.metadata.generation;
    let observed_generation = email.status.as_ref().and_then(|s| s.observed_generation);
    generation.is_some() && generation == observed_generation
}

/// Re-verify an EmailSenderConfig on every event and on a fixed interval
async fn reconcile_sender_config_object(
    obj: Arc<EmailSenderConfig>,
    ctx: Arc<Reconciler>,
    reverify_interval: Duration,
) -> Result<Action, ReconcilerError> {
    let key = ResourceKey::from_meta(&obj.metadata);

    reconcile_sender_config(&ctx, &key).await?;
    ctx.reset_backoff(&backoff_key("EmailSenderConfig", &key));
    crate::observability::metrics::increment_requeues_total("reverify");
    Ok(Action::requeue(reverify_interval))
}

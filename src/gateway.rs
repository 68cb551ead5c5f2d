//! HTTP server for relaychat
//!
//! Wires the history store, model invoker and router together, serves until
//! SIGINT/SIGTERM, then stops the background sweep.

use crate::chat::ChatService;
use crate::config::{Config, StoreConfig};
use crate::http::{AppState, build_router};
use crate::providers::ModelInvoker;
use crate::session::{
    FileKvStore, HistoryStore, KvStore, MemoryKvStore, SWEEP_INTERVAL_SECS, start_sweep_task,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Builds the configured key-value backend, if any.
pub async fn build_store(store: &StoreConfig) -> Result<Option<Arc<dyn KvStore>>> {
    match store {
        StoreConfig::None => Ok(None),
        StoreConfig::Memory => Ok(Some(Arc::new(MemoryKvStore::new()) as Arc<dyn KvStore>)),
        StoreConfig::File { dir } => {
            let file_store = FileKvStore::new(dir.clone());
            file_store
                .initialize()
                .await
                .with_context(|| format!("Failed to initialize store directory {:?}", dir))?;
            Ok(Some(Arc::new(file_store) as Arc<dyn KvStore>))
        }
    }
}

/// Builds the chat service from configuration.
pub async fn build_service(config: &Config) -> Result<(ChatService, Option<Arc<dyn KvStore>>)> {
    let store = build_store(&config.store).await?;
    let invoker = ModelInvoker::from_config(config).context("Failed to configure model invoker")?;

    if !invoker.has_binding() && !invoker.has_fallback() {
        warn!(
            "No local binding and no REST credentials configured; chat requests will fail. \
             Set RELAYCHAT_BINDING_URL or CF_ACCOUNT_ID and CF_AI_API_TOKEN."
        );
    }
    if store.is_none() {
        warn!("History store disabled; client-supplied history will be trusted");
    }

    let history = HistoryStore::new(store.clone());
    Ok((ChatService::new(invoker, history), store))
}

/// Runs the server with graceful shutdown.
pub async fn run_gateway(config: &Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting relaychat server"
    );

    let (service, store) = build_service(config).await?;

    let sweep = store.map(|store| {
        info!(
            backend = store.backend_name(),
            "History expiry sweep started ({}s interval)", SWEEP_INTERVAL_SECS
        );
        start_sweep_task(store, Duration::from_secs(SWEEP_INTERVAL_SECS))
    });

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(address = %addr, "relaychat listening on http://{}", addr);

    let router = build_router(AppState::new(service));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Some((handle, shutdown)) = sweep {
        let _ = shutdown.send(()).await;
        if let Err(e) = handle.await {
            error!("Sweep task panicked: {}", e);
        }
    }

    info!("relaychat server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {}", e);
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating graceful shutdown...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}
